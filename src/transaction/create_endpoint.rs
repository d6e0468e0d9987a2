//! Defines the endpoint for creating a new transaction.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    datetime::parse_instant,
    db::lock_connection,
    transaction::{Transaction, TransactionType, core::create_transaction},
    user::UserID,
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The JSON body for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Either "income" or "expense".
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The category, e.g. "Groceries".
    pub category: String,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// Text detailing the transaction.
    #[serde(default)]
    pub description: Option<String>,
    /// When the transaction happened, either `YYYY-MM-DD` or RFC 3339.
    /// Defaults to the current time.
    #[serde(default)]
    pub date: Option<String>,
}

/// A route handler for creating a new transaction owned by the caller.
///
/// Responds with 201 and the created transaction.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserID>,
    WithRejection(Json(request), _): WithRejection<Json<CreateTransactionRequest>, Error>,
) -> Response {
    match create(request, user_id, &state) {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(error) => error.context("Transaction creation failed").into_response(),
    }
}

fn create(
    request: CreateTransactionRequest,
    user_id: UserID,
    state: &CreateTransactionState,
) -> Result<Transaction, Error> {
    let date = match request.date.as_deref() {
        Some(text) => parse_instant(text, &state.local_timezone)?,
        None => OffsetDateTime::now_utc(),
    };

    let builder = Transaction::build(
        user_id,
        request.transaction_type,
        &request.category,
        request.amount,
        date,
    )
    .description(request.description);

    let connection = lock_connection(&state.db_connection)?;
    let transaction = create_transaction(builder, &connection)?;

    tracing::debug!("User {user_id} created transaction {}", transaction.id);

    Ok(transaction)
}

#[cfg(test)]
mod create_transaction_tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use time::{Duration, OffsetDateTime, macros::datetime};

    use crate::{
        endpoints,
        test_utils::{create_test_user, get_test_server},
        transaction::{Transaction, TransactionType},
    };

    #[tokio::test]
    async fn creates_transaction() {
        let (server, state) = get_test_server();
        let (user, token) = create_test_user(&state, "alice@example.com");

        let response = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(token)
            .json(&json!({
                "type": "expense",
                "category": "Groceries",
                "amount": 42.5,
                "description": "Weekly shop",
                "date": "2024-01-15"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let transaction = response.json::<Transaction>();
        assert_eq!(transaction.user_id, user.id);
        assert_eq!(transaction.transaction_type, TransactionType::Expense);
        assert_eq!(transaction.category, "Groceries");
        assert_eq!(transaction.amount, 42.5);
        assert_eq!(transaction.description.as_deref(), Some("Weekly shop"));
        assert_eq!(transaction.date, datetime!(2024-01-15 00:00 UTC));
    }

    #[tokio::test]
    async fn date_defaults_to_now() {
        let (server, state) = get_test_server();
        let (_, token) = create_test_user(&state, "alice@example.com");
        let before = OffsetDateTime::now_utc() - Duration::seconds(1);

        let response = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(token)
            .json(&json!({"type": "income", "category": "Salary", "amount": 1000}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let transaction = response.json::<Transaction>();
        assert!(transaction.date >= before);
        assert!(transaction.date <= OffsetDateTime::now_utc() + Duration::seconds(1));
        assert_eq!(transaction.description, None);
    }

    #[tokio::test]
    async fn response_uses_camel_case_fields() {
        let (server, state) = get_test_server();
        let (user, token) = create_test_user(&state, "alice@example.com");

        let response = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(token)
            .json(&json!({
                "type": "income",
                "category": "Salary",
                "amount": 1000,
                "date": "2024-03-01T09:30:00Z"
            }))
            .await;

        let body = response.json::<Value>();
        assert_eq!(body["userId"], json!(user.id.as_i64()));
        assert_eq!(body["type"], "income");
        assert_eq!(body["date"], "2024-03-01T09:30:00Z");
        assert!(body["createdAt"].is_string());
        assert!(body["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn rejects_unknown_type() {
        let (server, state) = get_test_server();
        let (_, token) = create_test_user(&state, "alice@example.com");

        let response = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(token)
            .json(&json!({"type": "refund", "category": "Food", "amount": 10}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["message"], "Invalid request");
    }

    #[tokio::test]
    async fn rejects_invalid_date() {
        let (server, state) = get_test_server();
        let (_, token) = create_test_user(&state, "alice@example.com");

        let response = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(token)
            .json(&json!({
                "type": "expense",
                "category": "Food",
                "amount": 10,
                "date": "yesterday"
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_date_outside_utc_range_without_storing_it() {
        let (server, state) = get_test_server();
        let (_, token) = create_test_user(&state, "alice@example.com");

        let response = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(token.clone())
            .json(&json!({
                "type": "expense",
                "category": "Food",
                "amount": 10,
                "date": "9999-12-31T23:59:59-10:00"
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["message"], "Invalid request");

        let list = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(token)
            .await;
        list.assert_status_ok();
        list.assert_json(&json!([]));
    }

    #[tokio::test]
    async fn rejects_missing_token() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({"type": "expense", "category": "Food", "amount": 10}))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
