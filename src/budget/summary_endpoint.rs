//! Defines the endpoint comparing a month's budget against its expenses.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Month;

use crate::{
    AppState, Error,
    budget::core::get_budget_for_period,
    datetime::{local_today, month_bounds},
    db::lock_connection,
    params::empty_string_as_none,
    transaction::{DateRange, TransactionFilter, TransactionType, sum_amount},
    user::UserID,
};

/// The state needed to summarise a budget.
#[derive(Debug, Clone)]
pub struct BudgetSummaryState {
    /// The database connection for reading budgets and transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetSummaryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The month to summarise. Defaults to the current local month.
#[derive(Debug, Default, Deserialize)]
pub struct BudgetSummaryQuery {
    /// The month, from 1 to 12.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub month: Option<u8>,
    /// The calendar year.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub year: Option<i32>,
}

/// A month's budget, what was spent, and what is left.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    /// The budget for the month, zero if none was set.
    pub budget: f64,
    /// The sum of the month's expenses.
    pub total_expenses: f64,
    /// The budget minus the expenses.
    pub balance: f64,
}

/// A route handler for the caller's budget, expenses and remaining balance for a month.
pub async fn get_budget_summary_endpoint(
    State(state): State<BudgetSummaryState>,
    Extension(user_id): Extension<UserID>,
    WithRejection(Query(query), _): WithRejection<Query<BudgetSummaryQuery>, Error>,
) -> Response {
    match get_summary(query, user_id, &state) {
        Ok(summary) => Json(summary).into_response(),
        Err(error) => error
            .context("Unable to fetch budget summary")
            .into_response(),
    }
}

fn get_summary(
    query: BudgetSummaryQuery,
    user_id: UserID,
    state: &BudgetSummaryState,
) -> Result<BudgetSummary, Error> {
    let today = local_today(&state.local_timezone)?;

    let month = match query.month {
        Some(month) => Month::try_from(month).map_err(|_| {
            Error::Validation(format!("month must be between 1 and 12, got {month}"))
        })?,
        None => today.month(),
    };
    let year = query.year.unwrap_or(today.year());

    let (start, end) = month_bounds(year, month, &state.local_timezone)?;
    let filter = TransactionFilter {
        date_range: DateRange {
            start: Some(start),
            end: Some(end),
        },
        ..TransactionFilter::for_user(user_id)
    }
    .with_type(TransactionType::Expense);

    let connection = lock_connection(&state.db_connection)?;
    let budget = get_budget_for_period(user_id, month, year, &connection)?
        .map_or(0.0, |budget| budget.amount);
    let total_expenses = sum_amount(&filter, &connection)?;

    Ok(BudgetSummary {
        budget,
        total_expenses,
        balance: budget - total_expenses,
    })
}
