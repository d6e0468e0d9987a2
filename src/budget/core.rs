//! Defines the budget model and its database queries.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::{Month, OffsetDateTime};

use crate::{
    Error,
    database_id::BudgetId,
    datetime::{timestamp_column, to_unix_millis},
    user::UserID,
};

/// The amount a user plans to spend in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The user the budget belongs to.
    pub user_id: UserID,
    /// The month, from 1 (January) to 12 (December).
    pub month: u8,
    /// The calendar year.
    pub year: i32,
    /// The amount of money allocated for the month.
    pub amount: f64,
    /// When the budget was first set.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the budget amount was last set.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const BUDGET_COLUMNS: &str = "id, user_id, month, year, amount, created_at, updated_at";

/// Set the budget of `user_id` for `month` of `year` to `amount`.
///
/// Creates the budget if the month has none, otherwise replaces the amount in
/// a single statement so concurrent calls cannot create duplicates.
///
/// # Errors
/// This function will return a:
/// - [Error::UserNotFound] if `user_id` does not refer to a registered user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn upsert_budget(
    user_id: UserID,
    month: Month,
    year: i32,
    amount: f64,
    connection: &Connection,
) -> Result<Budget, Error> {
    let now = to_unix_millis(OffsetDateTime::now_utc());

    connection
        .prepare(&format!(
            "INSERT INTO budget (user_id, month, year, amount, created_at, updated_at) \
            VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
            ON CONFLICT(user_id, month, year) \
            DO UPDATE SET amount = excluded.amount, updated_at = excluded.updated_at \
            RETURNING {BUDGET_COLUMNS}"
        ))?
        .query_row(
            params![user_id, u8::from(month), year, amount, now],
            map_budget_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::UserNotFound,
            error => error.into(),
        })
}

/// Get the budget of `user_id` for `month` of `year`, if one has been set.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_budget_for_period(
    user_id: UserID,
    month: Month,
    year: i32,
    connection: &Connection,
) -> Result<Option<Budget>, Error> {
    let result = connection
        .prepare(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget \
            WHERE user_id = ?1 AND month = ?2 AND year = ?3"
        ))?
        .query_row(params![user_id, u8::from(month), year], map_budget_row);

    match result {
        Ok(budget) => Ok(Some(budget)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Create the budget table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
                year INTEGER NOT NULL,
                amount REAL NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(user_id, month, year),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        month: row.get(2)?,
        year: row.get(3)?,
        amount: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
    })
}

#[cfg(test)]
mod budget_tests {
    use rusqlite::Connection;
    use time::Month;

    use crate::{
        Error,
        db::initialize,
        password::PasswordHash,
        user::{User, UserID, create_user},
    };

    use super::{get_budget_for_period, upsert_budget};

    fn get_test_connection() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user(
            "Test User",
            "test@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        (conn, user)
    }

    #[test]
    fn upsert_creates_budget() {
        let (conn, user) = get_test_connection();

        let budget = upsert_budget(user.id, Month::March, 2024, 500.0, &conn).unwrap();

        assert_eq!(budget.user_id, user.id);
        assert_eq!(budget.month, 3);
        assert_eq!(budget.year, 2024);
        assert_eq!(budget.amount, 500.0);
    }

    #[test]
    fn upsert_replaces_amount_for_same_period() {
        let (conn, user) = get_test_connection();

        let first = upsert_budget(user.id, Month::March, 2024, 500.0, &conn).unwrap();
        let second = upsert_budget(user.id, Month::March, 2024, 700.0, &conn).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.amount, 700.0);
        assert_eq!(second.created_at, first.created_at);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM budget", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            get_budget_for_period(user.id, Month::March, 2024, &conn),
            Ok(Some(second))
        );
    }

    #[test]
    fn periods_are_independent() {
        let (conn, user) = get_test_connection();

        upsert_budget(user.id, Month::March, 2024, 500.0, &conn).unwrap();
        upsert_budget(user.id, Month::April, 2024, 600.0, &conn).unwrap();
        upsert_budget(user.id, Month::March, 2025, 700.0, &conn).unwrap();

        let march = get_budget_for_period(user.id, Month::March, 2024, &conn)
            .unwrap()
            .unwrap();
        assert_eq!(march.amount, 500.0);
    }

    #[test]
    fn missing_budget_is_none() {
        let (conn, user) = get_test_connection();

        assert_eq!(
            get_budget_for_period(user.id, Month::March, 2024, &conn),
            Ok(None)
        );
    }

    #[test]
    fn upsert_fails_on_unknown_user() {
        let (conn, _) = get_test_connection();

        assert_eq!(
            upsert_budget(UserID::new(999), Month::March, 2024, 500.0, &conn),
            Err(Error::UserNotFound)
        );
    }
}
