//! Monthly budgets and the budget summary.
//!
//! A user has at most one budget per calendar month. Setting a budget for a
//! month that already has one replaces its amount.

mod core;
mod set_endpoint;
mod summary_endpoint;

pub use core::{Budget, create_budget_table};
pub use set_endpoint::set_budget_endpoint;
pub use summary_endpoint::get_budget_summary_endpoint;
