//! Cross-origin policy for browser clients.

use axum::http::{HeaderValue, Method, header, request::Parts};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// The origins allowed to call the API from a browser.
#[derive(Debug, Clone, PartialEq)]
pub struct CorsConfig {
    /// Origins that are allowed exactly, e.g. "http://localhost:3000".
    pub allowed_origins: Vec<String>,
    /// Any origin ending with this suffix is allowed, e.g. ".example.app".
    pub allowed_origin_suffix: Option<String>,
}

impl CorsConfig {
    /// Whether a request from `origin` may read responses.
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
            || self
                .allowed_origin_suffix
                .as_deref()
                .is_some_and(|suffix| !suffix.is_empty() && origin.ends_with(suffix))
    }

    /// Build the CORS layer for this allow-list. Credentials are allowed.
    pub fn into_layer(self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _request: &Parts| {
                    origin
                        .to_str()
                        .is_ok_and(|origin| self.is_allowed(origin))
                },
            ))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    }
}
