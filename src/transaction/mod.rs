//! Transaction management for the budget tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, filtering and aggregating transactions
//! - Route handlers for the transaction API

mod categories_endpoint;
mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;
mod query;
mod stats_endpoint;

pub use categories_endpoint::get_categories_endpoint;
pub use core::{Transaction, TransactionType, create_transaction_table};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use list_endpoint::list_transactions_endpoint;
pub use query::{DateRange, TransactionFilter, sum_amount};
pub use stats_endpoint::get_transaction_stats_endpoint;

#[cfg(test)]
pub use core::create_transaction;
