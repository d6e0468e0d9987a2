//! Defines the endpoint for the categories a user has used.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, db::lock_connection, transaction::query::get_categories, user::UserID};

/// The state needed to list categories.
#[derive(Debug, Clone)]
pub struct CategoriesState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for the distinct categories of the caller's transactions.
pub async fn get_categories_endpoint(
    State(state): State<CategoriesState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let categories = lock_connection(&state.db_connection)
        .and_then(|connection| get_categories(user_id, &connection));

    match categories {
        Ok(categories) => Json(categories).into_response(),
        Err(error) => error.context("Unable to fetch categories").into_response(),
    }
}
