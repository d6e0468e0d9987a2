//! Defines the endpoint for listing, filtering and paging a user's transactions.
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
    pagination::{Pagination, ResponseMode},
    params::empty_string_as_none,
    transaction::{
        Transaction, TransactionType,
        query::{AmountRange, DateRange, TransactionFilter, count_transactions, list_transactions},
    },
    user::UserID,
};

/// The state needed to list transactions.
#[derive(Debug, Clone)]
pub struct ListTransactionsState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for ListTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The query parameters for listing transactions.
///
/// Empty values are treated as if the parameter was not given.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsQuery {
    /// The 1-indexed page. Selects a paginated response when present.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<u64>,
    /// The page size.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub limit: Option<u64>,
    /// Only include income or only include expenses.
    #[serde(default, rename = "type", deserialize_with = "empty_string_as_none")]
    pub transaction_type: Option<TransactionType>,
    /// Only include this category.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub category: Option<String>,
    /// The first day (or instant) to include.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub start_date: Option<String>,
    /// The last day to include, up to the end of that day.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub end_date: Option<String>,
    /// The smallest amount to include.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub min_amount: Option<f64>,
    /// The largest amount to include.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub max_amount: Option<f64>,
}

/// The two shapes of the list response, see [ResponseMode].
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ListTransactionsResponse {
    /// Every matching transaction.
    Bare(Vec<Transaction>),
    /// One page of matching transactions.
    Paginated {
        /// The transactions on the requested page.
        data: Vec<Transaction>,
        /// Where the page sits within all matching transactions.
        pagination: Pagination,
    },
}

/// A route handler for listing the caller's transactions, newest first.
pub async fn list_transactions_endpoint(
    State(state): State<ListTransactionsState>,
    Extension(user_id): Extension<UserID>,
    WithRejection(Query(query), _): WithRejection<Query<ListTransactionsQuery>, Error>,
) -> Response {
    match list(query, user_id, &state) {
        Ok(response) => Json(response).into_response(),
        Err(error) => error
            .context("Unable to retrieve transactions")
            .into_response(),
    }
}

fn list(
    query: ListTransactionsQuery,
    user_id: UserID,
    state: &ListTransactionsState,
) -> Result<ListTransactionsResponse, Error> {
    let filter = TransactionFilter {
        user_id,
        transaction_type: query.transaction_type,
        category: query.category,
        date_range: DateRange::from_params(
            query.start_date.as_deref(),
            query.end_date.as_deref(),
            &state.local_timezone,
        )?,
        amount_range: AmountRange {
            min: query.min_amount,
            max: query.max_amount,
        },
    };

    let connection = lock_connection(&state.db_connection)?;

    match ResponseMode::from_params(query.page, query.limit) {
        ResponseMode::Bare => Ok(ListTransactionsResponse::Bare(list_transactions(
            &filter,
            None,
            &connection,
        )?)),
        ResponseMode::Paginated(page) => {
            let data = list_transactions(&filter, Some(page), &connection)?;
            let total = count_transactions(&filter, &connection)?;

            Ok(ListTransactionsResponse::Paginated {
                data,
                pagination: Pagination::new(page, total),
            })
        }
    }
}
