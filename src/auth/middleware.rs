//! Authentication middleware that verifies bearer tokens and resolves the calling user.

use std::sync::{Arc, Mutex};

use axum::{
    RequestPartsExt,
    extract::{FromRef, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::DecodingKey;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::token::decode_token,
    db::lock_connection,
    user::{User, get_user_by_id},
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key used to verify bearer tokens.
    pub decoding_key: DecodingKey,
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            decoding_key: state.decoding_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Middleware function that checks for a valid bearer token.
///
/// The resolved [User] and their [crate::UserID] are placed into the request
/// extensions and the request is executed normally if the token is valid,
/// otherwise a JSON error is returned:
/// - 401 if the `Authorization` header is missing, malformed, or the token is invalid or expired,
/// - 404 if the token's subject is not a registered user.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let user = match authenticate(&mut parts, &state).await {
        Ok(user) => user,
        Err(error) => return error.context("Authentication failed").into_response(),
    };

    parts.extensions.insert(user.id);
    parts.extensions.insert(user);

    next.run(Request::from_parts(parts, body)).await
}

async fn authenticate(parts: &mut Parts, state: &AuthState) -> Result<User, Error> {
    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|rejection| {
            if rejection.is_missing() {
                Error::MissingToken
            } else {
                Error::InvalidToken
            }
        })?;

    let claims = decode_token(bearer.token(), &state.decoding_key)?;

    let connection = lock_connection(&state.db_connection)?;

    get_user_by_id(claims.id, &connection).map_err(|error| match error {
        Error::NotFound => Error::UserNotFound,
        error => error,
    })
}
