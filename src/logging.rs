//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes, to_bytes},
    extract::{FromRequest, Request},
    http::{HeaderMap, HeaderValue, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::Error;

/// The number of characters of a body that are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level with the
/// `Authorization` header redacted.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] characters, it is
/// truncated and the full body is logged at the `debug` level.
///
/// Request bodies over axum's default body limit of 2 MB are rejected with
/// 413. Bodies are passed on byte for byte, only the logged copy is decoded.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match read_request_body(body).await {
        Ok(bytes) => bytes,
        Err(error) => return error.into_response(),
    };
    let body_text = String::from_utf8_lossy(&bytes);

    tracing::info!(
        "Received request: {} {}\nheaders: {:#?}\nbody: {}",
        parts.method,
        parts.uri,
        redact_headers(&parts.headers),
        truncate(&body_text)
    );
    log_full_body("request", &body_text);

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => return Error::ResponseBody(error.to_string()).into_response(),
    };
    let body_text = String::from_utf8_lossy(&bytes);

    tracing::info!(
        "Sending response: {}\nheaders: {:#?}\nbody: {}",
        parts.status,
        parts.headers,
        truncate(&body_text)
    );
    log_full_body("response", &body_text);

    Response::from_parts(parts, Body::from(bytes))
}

/// Buffer a request body, applying axum's default body limit.
async fn read_request_body(body: Body) -> Result<Bytes, Error> {
    Ok(Bytes::from_request(Request::new(body), &()).await?)
}

fn redact_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();

    if headers.contains_key(AUTHORIZATION) {
        headers.insert(AUTHORIZATION, HeaderValue::from_static("********"));
    }

    headers
}

fn truncate(body: &str) -> String {
    if body.chars().count() > LOG_BODY_LENGTH_LIMIT {
        format!(
            "{}...",
            body.chars().take(LOG_BODY_LENGTH_LIMIT).collect::<String>()
        )
    } else {
        body.to_owned()
    }
}

fn log_full_body(kind: &str, body: &str) {
    if body.chars().count() > LOG_BODY_LENGTH_LIMIT {
        tracing::debug!("Full {kind} body: {body:?}");
    }
}
