//! Defines the app level error type and its conversion to JSON error responses.

use axum::{
    Json,
    extract::rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request did not include an `Authorization` header.
    #[error("no token provided")]
    MissingToken,

    /// The bearer token was malformed, had an invalid signature or has expired.
    #[error("invalid token")]
    InvalidToken,

    /// A token could not be signed.
    ///
    /// Callers should pass in the original error as a string.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// The subject of a valid token does not refer to a registered user.
    #[error("user not found")]
    UserNotFound,

    /// The transaction ID does not refer to a stored transaction.
    #[error("transaction not found")]
    TransactionNotFound,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The resource exists but belongs to another user.
    #[error("access denied")]
    AccessDenied,

    /// The request body, query string or path could not be turned into the
    /// expected types, e.g. an unknown transaction type or a month of 13.
    #[error("{0}")]
    Validation(String),

    /// The request body is larger than the server accepts.
    #[error("the request body is too large")]
    PayloadTooLarge,

    /// A response body could not be read back for logging.
    #[error("could not read the response body: {0}")]
    ResponseBody(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A user with the email address already exists.
    #[error("the email address \"{0}\" is already registered")]
    DuplicateEmail(String),

    /// The configured local timezone is not a canonical timezone name.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    ///
    /// The inner error is logged on the server and never sent to clients.
    #[error("an unexpected database error occurred")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {error}");
                Error::SqlError(error)
            }
        }
    }
}

impl From<BytesRejection> for Error {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge
        } else {
            Error::Validation(rejection.body_text())
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl Error {
    /// The HTTP status code that this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingToken | Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::AccessDenied => StatusCode::FORBIDDEN,
            Error::UserNotFound | Error::TransactionNotFound | Error::NotFound => {
                StatusCode::NOT_FOUND
            }
            Error::Validation(_) | Error::TooWeak(_) | Error::DuplicateEmail(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Error::TokenCreation(_)
            | Error::ResponseBody(_)
            | Error::HashingError(_)
            | Error::InvalidTimezone(_)
            | Error::DatabaseLockError
            | Error::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Attach an operation specific `message` that is shown to the client if
    /// this error turns out to be an internal server error.
    pub fn context(self, message: &'static str) -> ErrorResponse {
        ErrorResponse {
            message,
            error: self,
        }
    }

    fn client_message(&self) -> &'static str {
        match self {
            Error::MissingToken => "No token provided",
            Error::InvalidToken => "Invalid token",
            Error::UserNotFound => "User not found",
            Error::TransactionNotFound => "Transaction not found",
            Error::NotFound => "Not found",
            Error::AccessDenied => "Access denied",
            Error::Validation(_) => "Invalid request",
            Error::PayloadTooLarge => "Payload too large",
            Error::TooWeak(_) => "Password is too weak",
            Error::DuplicateEmail(_) => "Email already registered",
            _ => "Internal server error",
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            Error::Validation(detail) | Error::TooWeak(detail) => Some(detail.clone()),
            error if error.status_code().is_server_error() => Some(error.to_string()),
            _ => None,
        }
    }
}

/// The JSON body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.context("Internal server error").into_response()
    }
}

/// An [Error] paired with a message describing the operation that failed.
#[derive(Debug)]
pub struct ErrorResponse {
    message: &'static str,
    error: Error,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.error.status_code();

        let message = if status.is_server_error() {
            tracing::error!("{}: {}", self.message, self.error);
            self.message
        } else {
            self.error.client_message()
        };

        let body = ErrorBody {
            message,
            error: self.error.detail(),
        };

        (status, Json(body)).into_response()
    }
}
