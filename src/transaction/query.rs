//! Filtered queries and aggregations over a user's transactions.

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    datetime::{parse_date_input, parse_instant, to_end_of_day, to_unix_millis},
    pagination::PageRequest,
    user::UserID,
};

use super::core::{Transaction, TransactionType, map_transaction_row};

/// An inclusive range of transaction dates. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateRange {
    /// The earliest date to include.
    pub start: Option<OffsetDateTime>,
    /// The latest date to include.
    pub end: Option<OffsetDateTime>,
}

impl DateRange {
    /// Build a range from the raw `startDate` and `endDate` query parameters.
    ///
    /// The start is the instant given, or local midnight for a plain date. The
    /// end always extends to the last millisecond of its local calendar day.
    ///
    /// # Errors
    /// Returns [Error::Validation] if either date cannot be parsed.
    pub fn from_params(
        start: Option<&str>,
        end: Option<&str>,
        timezone: &str,
    ) -> Result<Self, Error> {
        let start = start
            .map(|text| parse_instant(text, timezone))
            .transpose()?;
        let end = end
            .map(|text| to_end_of_day(parse_date_input(text)?, timezone))
            .transpose()?;

        Ok(Self { start, end })
    }
}

/// An inclusive range of transaction amounts. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AmountRange {
    /// The smallest amount to include.
    pub min: Option<f64>,
    /// The largest amount to include.
    pub max: Option<f64>,
}

/// Selects the transactions of one user.
///
/// Every condition other than the owner is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFilter {
    /// The owner of the transactions.
    pub user_id: UserID,
    /// Only include income or only include expenses.
    pub transaction_type: Option<TransactionType>,
    /// Only include transactions with exactly this category.
    pub category: Option<String>,
    /// Only include transactions within this date range.
    pub date_range: DateRange,
    /// Only include transactions within this amount range.
    pub amount_range: AmountRange,
}

impl TransactionFilter {
    /// A filter matching every transaction owned by `user_id`.
    pub fn for_user(user_id: UserID) -> Self {
        Self {
            user_id,
            transaction_type: None,
            category: None,
            date_range: DateRange::default(),
            amount_range: AmountRange::default(),
        }
    }

    /// Restrict the filter to one transaction type.
    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    /// Build the `WHERE` clause and its positional parameters.
    fn to_sql(&self) -> (String, Vec<Value>) {
        let mut conditions = vec!["user_id = ?".to_owned()];
        let mut values = vec![Value::Integer(self.user_id.as_i64())];

        if let Some(transaction_type) = self.transaction_type {
            conditions.push("type = ?".to_owned());
            values.push(Value::Text(transaction_type.as_str().to_owned()));
        }

        if let Some(category) = &self.category {
            conditions.push("category = ?".to_owned());
            values.push(Value::Text(category.clone()));
        }

        if let Some(start) = self.date_range.start {
            conditions.push("date >= ?".to_owned());
            values.push(Value::Integer(to_unix_millis(start)));
        }

        if let Some(end) = self.date_range.end {
            conditions.push("date <= ?".to_owned());
            values.push(Value::Integer(to_unix_millis(end)));
        }

        if let Some(min) = self.amount_range.min {
            conditions.push("amount >= ?".to_owned());
            values.push(Value::Real(min));
        }

        if let Some(max) = self.amount_range.max {
            conditions.push("amount <= ?".to_owned());
            values.push(Value::Real(max));
        }

        (format!("WHERE {}", conditions.join(" AND ")), values)
    }
}

/// Get the transactions matching `filter`, newest first.
///
/// If `page` is `None` every matching transaction is returned.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails or a row cannot be mapped.
pub fn list_transactions(
    filter: &TransactionFilter,
    page: Option<PageRequest>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let (where_clause, mut values) = filter.to_sql();

    // Sort by date, and then ID to keep transaction order stable after updates
    let mut query = format!(
        "SELECT id, user_id, type, category, amount, description, date, created_at, updated_at \
        FROM \"transaction\" {where_clause} ORDER BY date DESC, id DESC"
    );

    if let Some(page) = page {
        query.push_str(" LIMIT ? OFFSET ?");
        values.push(Value::Integer(saturating_i64(page.limit)));
        values.push(Value::Integer(saturating_i64(page.offset())));
    }

    connection
        .prepare(&query)?
        .query_map(params_from_iter(values), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::from))
        .collect()
}

/// Count the transactions matching `filter`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn count_transactions(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<u64, Error> {
    let (where_clause, values) = filter.to_sql();

    let count: i64 = connection.query_row(
        &format!("SELECT COUNT(id) FROM \"transaction\" {where_clause}"),
        params_from_iter(values),
        |row| row.get(0),
    )?;

    Ok(count.unsigned_abs())
}

/// Sum the amounts of the transactions matching `filter`, zero if there are none.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn sum_amount(filter: &TransactionFilter, connection: &Connection) -> Result<f64, Error> {
    let (where_clause, values) = filter.to_sql();

    connection
        .query_row(
            &format!("SELECT COALESCE(SUM(amount), 0.0) FROM \"transaction\" {where_clause}"),
            params_from_iter(values),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// The total spent in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category name.
    #[serde(rename = "_id")]
    pub category: String,
    /// The sum of the expenses in the category.
    pub sum: f64,
}

/// Total the expenses matching `filter` per category, largest total first.
///
/// Any type condition on `filter` is replaced with [TransactionType::Expense].
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn sum_expenses_by_category(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    let (where_clause, values) = filter.clone().with_type(TransactionType::Expense).to_sql();

    connection
        .prepare(&format!(
            "SELECT category, SUM(amount) AS total FROM \"transaction\" {where_clause} \
            GROUP BY category ORDER BY total DESC, category ASC"
        ))?
        .query_map(params_from_iter(values), |row| {
            Ok(CategoryTotal {
                category: row.get(0)?,
                sum: row.get(1)?,
            })
        })?
        .map(|total_result| total_result.map_err(Error::from))
        .collect()
}

/// Get the distinct categories `user_id` has used, in alphabetical order.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_categories(user_id: UserID, connection: &Connection) -> Result<Vec<String>, Error> {
    connection
        .prepare(
            "SELECT DISTINCT category FROM \"transaction\" \
            WHERE user_id = :user_id ORDER BY category ASC",
        )?
        .query_map(&[(":user_id", &user_id)], |row| row.get(0))?
        .map(|category_result| category_result.map_err(Error::from))
        .collect()
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::{Duration, macros::datetime};

    use crate::{
        db::initialize,
        pagination::PageRequest,
        password::PasswordHash,
        transaction::{Transaction, TransactionType, create_transaction},
        user::{User, create_user},
    };

    use super::{
        AmountRange, CategoryTotal, DateRange, TransactionFilter, count_transactions,
        get_categories, list_transactions, sum_amount, sum_expenses_by_category,
    };

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

    fn insert(
        conn: &Connection,
        user: &User,
        transaction_type: TransactionType,
        category: &str,
        amount: f64,
        date: time::OffsetDateTime,
    ) -> Transaction {
        create_transaction(
            Transaction::build(user.id, transaction_type, category, amount, date),
            conn,
        )
        .expect("Could not create transaction")
    }

    #[test]
    fn list_is_scoped_to_user() {
        let (conn, user) = get_test_connection();
        let other_user = create_user(
            "Other User",
            "other@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();
        let date = datetime!(2024-01-10 12:00 UTC);
        let mine = insert(&conn, &user, TransactionType::Expense, "Food", 1.0, date);
        insert(&conn, &other_user, TransactionType::Expense, "Food", 2.0, date);

        let got = list_transactions(&TransactionFilter::for_user(user.id), None, &conn).unwrap();

        assert_eq!(got, vec![mine]);
    }

    #[test]
    fn list_orders_newest_first() {
        let (conn, user) = get_test_connection();
        let start = datetime!(2024-01-01 00:00 UTC);
        let mut want: Vec<Transaction> = (0..5)
            .map(|i| {
                insert(
                    &conn,
                    &user,
                    TransactionType::Expense,
                    "Food",
                    i as f64,
                    start + Duration::days(i),
                )
            })
            .collect();
        want.reverse();

        let got = list_transactions(&TransactionFilter::for_user(user.id), None, &conn).unwrap();

        assert_eq!(got, want);
    }

    #[test]
    fn date_range_is_inclusive() {
        let (conn, user) = get_test_connection();
        for date in [
            datetime!(2023-12-31 23:59:59.999 UTC),
            datetime!(2024-01-01 00:00 UTC),
            datetime!(2024-01-31 23:59:59.999 UTC),
            datetime!(2024-02-01 00:00 UTC),
        ] {
            insert(&conn, &user, TransactionType::Expense, "Food", 1.0, date);
        }
        let filter = TransactionFilter {
            date_range: DateRange {
                start: Some(datetime!(2024-01-01 00:00 UTC)),
                end: Some(datetime!(2024-01-31 23:59:59.999 UTC)),
            },
            ..TransactionFilter::for_user(user.id)
        };

        let got = list_transactions(&filter, None, &conn).unwrap();

        let dates: Vec<_> = got.iter().map(|transaction| transaction.date).collect();
        assert_eq!(
            dates,
            vec![
                datetime!(2024-01-31 23:59:59.999 UTC),
                datetime!(2024-01-01 00:00 UTC)
            ]
        );
    }

    #[test]
    fn date_range_params_cover_whole_days() {
        let got = DateRange::from_params(Some("2024-01-01"), Some("2024-01-31"), "Etc/UTC");

        assert_eq!(
            got,
            Ok(DateRange {
                start: Some(datetime!(2024-01-01 00:00 UTC)),
                end: Some(datetime!(2024-01-31 23:59:59.999 UTC)),
            })
        );
    }

    #[test]
    fn date_range_params_reject_garbage() {
        assert!(DateRange::from_params(None, Some("soon"), "Etc/UTC").is_err());
    }

    #[test]
    fn filters_by_type_category_and_amount() {
        let (conn, user) = get_test_connection();
        let date = datetime!(2024-01-10 12:00 UTC);
        insert(&conn, &user, TransactionType::Income, "Food", 20.0, date);
        insert(&conn, &user, TransactionType::Expense, "Rent", 20.0, date);
        insert(&conn, &user, TransactionType::Expense, "Food", 5.0, date);
        insert(&conn, &user, TransactionType::Expense, "Food", 50.0, date);
        let want = insert(&conn, &user, TransactionType::Expense, "Food", 20.0, date);
        let filter = TransactionFilter {
            transaction_type: Some(TransactionType::Expense),
            category: Some("Food".to_owned()),
            amount_range: AmountRange {
                min: Some(10.0),
                max: Some(20.0),
            },
            ..TransactionFilter::for_user(user.id)
        };

        let got = list_transactions(&filter, None, &conn).unwrap();

        assert_eq!(got, vec![want]);
    }

    #[test]
    fn page_limits_results() {
        let (conn, user) = get_test_connection();
        let start = datetime!(2024-01-01 00:00 UTC);
        for i in 0..25 {
            insert(
                &conn,
                &user,
                TransactionType::Expense,
                "Food",
                1.0,
                start + Duration::hours(i),
            );
        }
        let filter = TransactionFilter::for_user(user.id);

        let got = list_transactions(&filter, Some(PageRequest::new(3, Some(10))), &conn).unwrap();

        assert_eq!(got.len(), 5);
        assert_eq!(got[0].date, start + Duration::hours(4));
        assert_eq!(count_transactions(&filter, &conn), Ok(25));
    }

    #[test]
    fn sums_by_type() {
        let (conn, user) = get_test_connection();
        let date = datetime!(2024-01-10 12:00 UTC);
        insert(&conn, &user, TransactionType::Expense, "Food", 100.0, date);
        insert(&conn, &user, TransactionType::Expense, "Rent", 50.0, date);
        insert(&conn, &user, TransactionType::Income, "Salary", 200.0, date);
        let filter = TransactionFilter::for_user(user.id);

        assert_eq!(
            sum_amount(&filter.clone().with_type(TransactionType::Income), &conn),
            Ok(200.0)
        );
        assert_eq!(
            sum_amount(&filter.with_type(TransactionType::Expense), &conn),
            Ok(150.0)
        );
    }

    #[test]
    fn sum_of_nothing_is_zero() {
        let (conn, user) = get_test_connection();

        assert_eq!(
            sum_amount(&TransactionFilter::for_user(user.id), &conn),
            Ok(0.0)
        );
    }

    #[test]
    fn category_totals_are_sorted_by_sum() {
        let (conn, user) = get_test_connection();
        let date = datetime!(2024-01-10 12:00 UTC);
        insert(&conn, &user, TransactionType::Expense, "Food", 30.0, date);
        insert(&conn, &user, TransactionType::Expense, "Rent", 100.0, date);
        insert(&conn, &user, TransactionType::Expense, "Food", 40.0, date);
        insert(&conn, &user, TransactionType::Expense, "Books", 70.0, date);
        insert(&conn, &user, TransactionType::Income, "Salary", 500.0, date);

        let got = sum_expenses_by_category(&TransactionFilter::for_user(user.id), &conn).unwrap();

        assert_eq!(
            got,
            vec![
                CategoryTotal {
                    category: "Rent".to_owned(),
                    sum: 100.0
                },
                CategoryTotal {
                    category: "Books".to_owned(),
                    sum: 70.0
                },
                CategoryTotal {
                    category: "Food".to_owned(),
                    sum: 70.0
                },
            ]
        );
    }

    #[test]
    fn categories_are_distinct_and_sorted() {
        let (conn, user) = get_test_connection();
        let date = datetime!(2024-01-10 12:00 UTC);
        insert(&conn, &user, TransactionType::Expense, "Rent", 1.0, date);
        insert(&conn, &user, TransactionType::Expense, "Food", 1.0, date);
        insert(&conn, &user, TransactionType::Income, "Food", 1.0, date);

        assert_eq!(
            get_categories(user.id, &conn),
            Ok(vec!["Food".to_owned(), "Rent".to_owned()])
        );
    }
}
