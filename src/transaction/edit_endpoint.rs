//! Defines the endpoint for updating a transaction.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    database_id::TransactionId,
    datetime::parse_instant,
    db::lock_connection,
    params::double_option,
    transaction::{
        Transaction, TransactionType,
        core::{get_transaction, update_transaction},
    },
    user::UserID,
};

/// The state needed to update a transaction.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The fields to change on a transaction. Absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionPatch {
    /// The new type.
    #[serde(default, rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// The new category, which may be empty.
    #[serde(default)]
    pub category: Option<String>,
    /// The new amount, which may be zero.
    #[serde(default)]
    pub amount: Option<f64>,
    /// `null` clears the description.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    /// The new date, either `YYYY-MM-DD` or RFC 3339.
    #[serde(default)]
    pub date: Option<String>,
}

/// A route handler for updating one of the caller's transactions.
///
/// Responds with 404 if the transaction does not exist and 403 if it belongs
/// to another user.
pub async fn edit_transaction_endpoint(
    State(state): State<EditTransactionState>,
    Extension(user_id): Extension<UserID>,
    WithRejection(Path(transaction_id), _): WithRejection<Path<TransactionId>, Error>,
    WithRejection(Json(patch), _): WithRejection<Json<TransactionPatch>, Error>,
) -> Response {
    match edit(transaction_id, user_id, patch, &state) {
        Ok(transaction) => Json(transaction).into_response(),
        Err(error) => error.context("Update failed").into_response(),
    }
}

fn edit(
    transaction_id: TransactionId,
    user_id: UserID,
    patch: TransactionPatch,
    state: &EditTransactionState,
) -> Result<Transaction, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let mut transaction = get_transaction(transaction_id, &connection)?;

    if transaction.user_id != user_id {
        tracing::warn!("User {user_id} tried to update transaction {transaction_id} of another user");
        return Err(Error::AccessDenied);
    }

    if let Some(transaction_type) = patch.transaction_type {
        transaction.transaction_type = transaction_type;
    }

    if let Some(category) = patch.category {
        transaction.category = category;
    }

    if let Some(amount) = patch.amount {
        transaction.amount = amount;
    }

    if let Some(description) = patch.description {
        transaction.description = description;
    }

    if let Some(date) = patch.date {
        transaction.date = parse_instant(&date, &state.local_timezone)?;
    }

    update_transaction(&transaction, &connection)
}
