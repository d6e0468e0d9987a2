//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}', use [format_endpoint].

/// The root route which reports that the API is running.
pub const ROOT: &str = "/";
/// The route to create and list transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to update or delete a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for income and expense statistics.
pub const TRANSACTION_STATS: &str = "/api/transactions/stats";
/// The route for the distinct categories of a user's transactions.
pub const TRANSACTION_CATEGORIES: &str = "/api/transactions/categories";
/// The route to set the budget for a month.
pub const BUDGET: &str = "/api/budget";
/// The route to compare a month's budget against its expenses.
pub const BUDGET_SUMMARY: &str = "/api/budget/summary";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is the text between a left brace and the next right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some((prefix, rest)) = endpoint_path.split_once('{') else {
        return endpoint_path.to_owned();
    };

    let suffix = rest.split_once('}').map_or("", |(_, suffix)| suffix);

    format!("{prefix}{id}{suffix}")
}
