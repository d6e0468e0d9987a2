//! Defines the endpoint for setting the budget of a month.
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
use time::Month;

use crate::{
    AppState, Error,
    budget::{Budget, core::upsert_budget},
    db::lock_connection,
    user::UserID,
};

/// The state needed to set a budget.
#[derive(Debug, Clone)]
pub struct SetBudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SetBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The JSON body for setting a budget.
#[derive(Debug, Deserialize)]
pub struct SetBudgetRequest {
    /// The month, from 1 to 12.
    pub month: u8,
    /// The calendar year.
    pub year: i32,
    /// The amount of money allocated for the month.
    pub amount: f64,
}

/// A route handler for creating or replacing the caller's budget for a month.
///
/// Responds with 201 and the stored budget whether it was created or updated.
pub async fn set_budget_endpoint(
    State(state): State<SetBudgetState>,
    Extension(user_id): Extension<UserID>,
    WithRejection(Json(request), _): WithRejection<Json<SetBudgetRequest>, Error>,
) -> Response {
    match set_budget(request, user_id, &state) {
        Ok(budget) => (StatusCode::CREATED, Json(budget)).into_response(),
        Err(error) => error.context("Budget operation failed").into_response(),
    }
}

fn set_budget(
    request: SetBudgetRequest,
    user_id: UserID,
    state: &SetBudgetState,
) -> Result<Budget, Error> {
    let month = Month::try_from(request.month).map_err(|_| {
        Error::Validation(format!(
            "month must be between 1 and 12, got {}",
            request.month
        ))
    })?;

    let connection = lock_connection(&state.db_connection)?;
    let budget = upsert_budget(user_id, month, request.year, request.amount, &connection)?;

    tracing::debug!(
        "User {user_id} set budget for {}-{:02} to {}",
        budget.year,
        budget.month,
        budget.amount
    );

    Ok(budget)
}
