//! Bearer token authentication.

mod middleware;
pub mod token;

pub use middleware::auth_guard;
pub use token::{Claims, DEFAULT_TOKEN_DURATION, decode_token, encode_token};
