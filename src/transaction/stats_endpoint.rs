//! Defines the endpoint for income and expense statistics.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    db::lock_connection,
    params::empty_string_as_none,
    transaction::{
        TransactionType,
        query::{CategoryTotal, DateRange, TransactionFilter, sum_amount, sum_expenses_by_category},
    },
    user::UserID,
};

/// The state needed to calculate transaction statistics.
#[derive(Debug, Clone)]
pub struct TransactionStatsState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionStatsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The optional date range to calculate statistics over.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatsQuery {
    /// The first day (or instant) to include.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub start_date: Option<String>,
    /// The last day to include.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub end_date: Option<String>,
}

/// Income and expense totals over a date range.
#[derive(Debug, PartialEq, Serialize)]
pub struct TransactionStats {
    /// Total income.
    pub income: f64,
    /// Total expenses.
    pub expenses: f64,
    /// Income minus expenses.
    pub balance: f64,
    /// Expenses per category, largest first.
    pub categories: Vec<CategoryTotal>,
}

/// A route handler for the caller's income, expenses and spending per category.
pub async fn get_transaction_stats_endpoint(
    State(state): State<TransactionStatsState>,
    Extension(user_id): Extension<UserID>,
    WithRejection(Query(query), _): WithRejection<Query<TransactionStatsQuery>, Error>,
) -> Response {
    match get_stats(query, user_id, &state) {
        Ok(stats) => Json(stats).into_response(),
        Err(error) => error
            .context("Unable to calculate statistics")
            .into_response(),
    }
}

fn get_stats(
    query: TransactionStatsQuery,
    user_id: UserID,
    state: &TransactionStatsState,
) -> Result<TransactionStats, Error> {
    let filter = TransactionFilter {
        date_range: DateRange::from_params(
            query.start_date.as_deref(),
            query.end_date.as_deref(),
            &state.local_timezone,
        )?,
        ..TransactionFilter::for_user(user_id)
    };

    let connection = lock_connection(&state.db_connection)?;

    let income = sum_amount(
        &filter.clone().with_type(TransactionType::Income),
        &connection,
    )?;
    let expenses = sum_amount(
        &filter.clone().with_type(TransactionType::Expense),
        &connection,
    )?;
    let categories = sum_expenses_by_category(&filter, &connection)?;

    Ok(TransactionStats {
        income,
        expenses,
        balance: income - expenses,
        categories,
    })
}

#[cfg(test)]
mod transaction_stats_tests {
    use serde_json::{Value, json};
    use time::{OffsetDateTime, macros::datetime};

    use crate::{
        AppState, endpoints,
        test_utils::{create_test_user, get_test_server},
        transaction::{Transaction, TransactionType, create_transaction},
        user::User,
    };

    fn insert(
        state: &AppState,
        user: &User,
        transaction_type: TransactionType,
        category: &str,
        amount: f64,
        date: OffsetDateTime,
    ) {
        let connection = state.db_connection.lock().unwrap();

        create_transaction(
            Transaction::build(user.id, transaction_type, category, amount, date),
            &connection,
        )
        .expect("Could not create transaction");
    }

    #[tokio::test]
    async fn calculates_totals_and_balance() {
        let (server, state) = get_test_server();
        let (user, token) = create_test_user(&state, "alice@example.com");
        let date = datetime!(2024-01-10 12:00 UTC);
        insert(&state, &user, TransactionType::Expense, "Rent", 100.0, date);
        insert(&state, &user, TransactionType::Expense, "Food", 50.0, date);
        insert(&state, &user, TransactionType::Income, "Salary", 200.0, date);

        let response = server
            .get(endpoints::TRANSACTION_STATS)
            .authorization_bearer(token)
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "income": 200.0,
            "expenses": 150.0,
            "balance": 50.0,
            "categories": [
                {"_id": "Rent", "sum": 100.0},
                {"_id": "Food", "sum": 50.0}
            ]
        }));
    }

    #[tokio::test]
    async fn stats_respect_date_range() {
        let (server, state) = get_test_server();
        let (user, token) = create_test_user(&state, "alice@example.com");
        insert(
            &state,
            &user,
            TransactionType::Expense,
            "Food",
            10.0,
            datetime!(2024-01-31 12:00 UTC),
        );
        insert(
            &state,
            &user,
            TransactionType::Expense,
            "Food",
            99.0,
            datetime!(2024-02-01 12:00 UTC),
        );

        let response = server
            .get(&format!(
                "{}?startDate=2024-01-01&endDate=2024-01-31",
                endpoints::TRANSACTION_STATS
            ))
            .authorization_bearer(token)
            .await;

        let body = response.json::<Value>();
        assert_eq!(body["expenses"], json!(10.0));
        assert_eq!(body["balance"], json!(-10.0));
    }

    #[tokio::test]
    async fn stats_for_new_user_are_zero() {
        let (server, state) = get_test_server();
        let (_, token) = create_test_user(&state, "alice@example.com");

        let response = server
            .get(endpoints::TRANSACTION_STATS)
            .authorization_bearer(token)
            .await;

        response.assert_json(&json!({
            "income": 0.0,
            "expenses": 0.0,
            "balance": 0.0,
            "categories": []
        }));
    }
}
