//! Shared fixtures for tests: in-memory app state, users and bearer tokens.

use axum_test::TestServer;
use rusqlite::Connection;

use crate::{
    AppState,
    auth::{DEFAULT_TOKEN_DURATION, encode_token},
    build_router,
    password::PasswordHash,
    user::{User, create_user},
};

/// The secret used to sign tokens in tests.
pub const TEST_TOKEN_SECRET: &str = "nafstenoas";

/// Create app state backed by an initialized in-memory database, with UTC as
/// the local timezone.
pub fn get_test_state() -> AppState {
    get_test_state_with_timezone("Etc/UTC")
}

/// Create app state backed by an initialized in-memory database, with
/// `timezone` as the local timezone, e.g. "Pacific/Auckland".
pub fn get_test_state_with_timezone(timezone: &str) -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open database in memory.");

    AppState::new(connection, TEST_TOKEN_SECRET, timezone)
        .expect("Could not create test app state.")
}

/// Insert a user with the email `email` and sign a bearer token for them.
pub fn create_test_user(state: &AppState, email: &str) -> (User, String) {
    let connection = state.db_connection.lock().unwrap();
    let user = create_user(
        "Test User",
        email,
        PasswordHash::new_unchecked("hunter2"),
        &connection,
    )
    .expect("Could not create test user.");

    let token = encode_token(user.id, DEFAULT_TOKEN_DURATION, &state.encoding_key)
        .expect("Could not create test token.");

    (user, token)
}

/// Create a test server for the full router, along with its state.
pub fn get_test_server() -> (TestServer, AppState) {
    get_test_server_with_timezone("Etc/UTC")
}

/// Create a test server for the full router whose local timezone is `timezone`.
pub fn get_test_server_with_timezone(timezone: &str) -> (TestServer, AppState) {
    let state = get_test_state_with_timezone(timezone);
    let server =
        TestServer::try_new(build_router(state.clone())).expect("Could not create test server.");

    (server, state)
}
