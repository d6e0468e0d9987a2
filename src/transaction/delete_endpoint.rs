//! Defines the endpoint for deleting a transaction.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error,
    database_id::TransactionId,
    db::lock_connection,
    transaction::core::{delete_transaction, get_transaction},
    user::UserID,
};

/// The state needed to delete a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    /// The database connection for managing transactions.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting one of the caller's transactions.
///
/// Responds with 404 if the transaction does not exist and 403 if it belongs
/// to another user.
pub async fn delete_transaction_endpoint(
    State(state): State<DeleteTransactionState>,
    Extension(user_id): Extension<UserID>,
    WithRejection(Path(transaction_id), _): WithRejection<Path<TransactionId>, Error>,
) -> Response {
    match delete(transaction_id, user_id, &state) {
        Ok(()) => Json(json!({"message": "Transaction removed successfully"})).into_response(),
        Err(error) => error.context("Deletion failed").into_response(),
    }
}

fn delete(
    transaction_id: TransactionId,
    user_id: UserID,
    state: &DeleteTransactionState,
) -> Result<(), Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = get_transaction(transaction_id, &connection)?;

    if transaction.user_id != user_id {
        tracing::warn!("User {user_id} tried to delete transaction {transaction_id} of another user");
        return Err(Error::AccessDenied);
    }

    match delete_transaction(transaction_id, &connection)? {
        0 => Err(Error::TransactionNotFound),
        _ => Ok(()),
    }
}
