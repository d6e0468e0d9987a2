//! Conversions between stored timestamps, client supplied dates and the
//! calendar days of the server's local timezone.

use rusqlite::Row;
use time::{
    Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::{format_description, time},
};

use crate::{Error, timezone::get_offset_on};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The last millisecond of a day. Stored timestamps have millisecond precision.
const END_OF_DAY: Time = time!(23:59:59.999);

/// A date or date-time supplied by a client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateInput {
    /// A calendar day such as `2024-01-31`, interpreted in local time.
    Day(Date),
    /// An exact instant such as `2024-01-31T08:30:00Z`.
    Instant(OffsetDateTime),
}

/// Parse either an RFC 3339 date-time or a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [Error::Validation] if `text` is in neither format.
pub fn parse_date_input(text: &str) -> Result<DateInput, Error> {
    if let Ok(instant) = OffsetDateTime::parse(text, &Rfc3339) {
        return Ok(DateInput::Instant(instant));
    }

    Date::parse(text, DATE_FORMAT)
        .map(DateInput::Day)
        .map_err(|_| {
            Error::Validation(format!(
                "invalid date \"{text}\", expected YYYY-MM-DD or an RFC 3339 date-time"
            ))
        })
}

/// Resolve a client date to a UTC instant: days start at local midnight.
///
/// # Errors
///
/// Returns [Error::Validation] if the instant cannot be represented in UTC,
/// e.g. `9999-12-31T23:59:59-10:00`.
pub fn to_instant(input: DateInput, timezone: &str) -> Result<OffsetDateTime, Error> {
    match input {
        DateInput::Day(date) => start_of_day(date, timezone),
        DateInput::Instant(instant) => to_utc(instant),
    }
}

/// Parse a client date and resolve it to an instant, see [to_instant].
pub fn parse_instant(text: &str, timezone: &str) -> Result<OffsetDateTime, Error> {
    to_instant(parse_date_input(text)?, timezone)
}

/// Resolve a client date to the last millisecond of its local calendar day.
pub fn to_end_of_day(input: DateInput, timezone: &str) -> Result<OffsetDateTime, Error> {
    let date = match input {
        DateInput::Day(date) => date,
        DateInput::Instant(instant) => {
            let offset = local_offset(timezone, instant.date())?;
            instant
                .checked_to_offset(offset)
                .ok_or_else(|| out_of_range(instant))?
                .date()
        }
    };

    end_of_day(date, timezone)
}

/// Local midnight at the start of `date`.
pub fn start_of_day(date: Date, timezone: &str) -> Result<OffsetDateTime, Error> {
    let offset = local_offset(timezone, date)?;

    to_utc(date.midnight().assume_offset(offset))
}

/// 23:59:59.999 local time on `date`.
pub fn end_of_day(date: Date, timezone: &str) -> Result<OffsetDateTime, Error> {
    let offset = local_offset(timezone, date)?;

    to_utc(PrimitiveDateTime::new(date, END_OF_DAY).assume_offset(offset))
}

/// The inclusive bounds of a calendar month in local time, from the first
/// instant of the first day to the last millisecond of the last day.
///
/// # Errors
///
/// Returns [Error::Validation] if `year` is outside the supported range.
pub fn month_bounds(
    year: i32,
    month: Month,
    timezone: &str,
) -> Result<(OffsetDateTime, OffsetDateTime), Error> {
    let invalid_year = |_| Error::Validation(format!("year {year} is out of range"));

    let first_day = Date::from_calendar_date(year, month, 1).map_err(invalid_year)?;
    let next_year = if month == Month::December {
        year + 1
    } else {
        year
    };
    let last_day = Date::from_calendar_date(next_year, month.next(), 1)
        .map_err(invalid_year)?
        .previous_day()
        .ok_or_else(|| Error::Validation(format!("year {year} is out of range")))?;

    Ok((
        start_of_day(first_day, timezone)?,
        end_of_day(last_day, timezone)?,
    ))
}

/// The current date in the local timezone.
pub fn local_today(timezone: &str) -> Result<Date, Error> {
    let now = OffsetDateTime::now_utc();
    let offset = local_offset(timezone, now.date())?;

    Ok(now.to_offset(offset).date())
}

/// Stored timestamps are read back as UTC, so every instant must fit in UTC.
fn to_utc(instant: OffsetDateTime) -> Result<OffsetDateTime, Error> {
    instant
        .checked_to_offset(UtcOffset::UTC)
        .ok_or_else(|| out_of_range(instant))
}

fn out_of_range(instant: OffsetDateTime) -> Error {
    Error::Validation(format!("date {instant} is out of the supported range"))
}

fn local_offset(timezone: &str, date: Date) -> Result<UtcOffset, Error> {
    get_offset_on(timezone, date).ok_or_else(|| Error::InvalidTimezone(timezone.to_owned()))
}

/// Convert an instant to the Unix milliseconds stored in the database.
pub fn to_unix_millis(instant: OffsetDateTime) -> i64 {
    (instant.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Read a Unix milliseconds column as a UTC date-time.
pub fn timestamp_column(row: &Row, index: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    let millis: i64 = row.get(index)?;

    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Integer,
            Box::new(error),
        )
    })
}

#[cfg(test)]
mod tests {
    use time::{
        Month,
        macros::{date, datetime},
    };

    use crate::{
        Error,
        datetime::{DateInput, month_bounds, parse_date_input, to_end_of_day, to_instant},
    };

    #[test]
    fn instants_are_normalised_to_utc() {
        let instant = to_instant(
            DateInput::Instant(datetime!(2024-01-31 08:30 +13)),
            "Etc/UTC",
        )
        .unwrap();

        assert_eq!(instant.offset(), time::UtcOffset::UTC);
        assert_eq!(instant, datetime!(2024-01-30 19:30 UTC));
    }

    #[test]
    fn rejects_instant_past_the_end_of_utc_range() {
        let input = parse_date_input("9999-12-31T23:59:59-10:00").unwrap();

        assert!(matches!(
            to_instant(input, "Etc/UTC"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn rejects_end_date_whose_local_day_is_out_of_range() {
        let input = parse_date_input("9999-12-31T23:00:00Z").unwrap();

        assert!(matches!(
            to_end_of_day(input, "Pacific/Auckland"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn parses_plain_date() {
        assert_eq!(
            parse_date_input("2024-01-31"),
            Ok(DateInput::Day(date!(2024 - 01 - 31)))
        );
    }

    #[test]
    fn parses_rfc3339() {
        assert_eq!(
            parse_date_input("2024-01-31T08:30:00Z"),
            Ok(DateInput::Instant(datetime!(2024-01-31 08:30 UTC)))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_date_input("last tuesday"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn day_starts_at_local_midnight() {
        let start = to_instant(DateInput::Day(date!(2024 - 01 - 01)), "Pacific/Auckland").unwrap();

        assert_eq!(start, datetime!(2024-01-01 00:00 +13));
    }

    #[test]
    fn end_of_day_is_last_millisecond() {
        let end = to_end_of_day(DateInput::Day(date!(2024 - 01 - 31)), "Etc/UTC").unwrap();

        assert_eq!(end, datetime!(2024-01-31 23:59:59.999 UTC));
    }

    #[test]
    fn end_of_day_for_instant_uses_its_local_day() {
        // 2024-01-31T20:00Z is already 1 February in Auckland.
        let end = to_end_of_day(
            DateInput::Instant(datetime!(2024-01-31 20:00 UTC)),
            "Pacific/Auckland",
        )
        .unwrap();

        assert_eq!(end, datetime!(2024-02-01 23:59:59.999 +13));
    }

    #[test]
    fn month_bounds_cover_whole_month() {
        let (start, end) = month_bounds(2024, Month::February, "Etc/UTC").unwrap();

        assert_eq!(start, datetime!(2024-02-01 00:00 UTC));
        assert_eq!(end, datetime!(2024-02-29 23:59:59.999 UTC));
    }

    #[test]
    fn december_bounds_end_on_new_years_eve() {
        let (_, end) = month_bounds(2023, Month::December, "Etc/UTC").unwrap();

        assert_eq!(end, datetime!(2023-12-31 23:59:59.999 UTC));
    }

    #[test]
    fn invalid_timezone_is_reported() {
        assert_eq!(
            to_instant(DateInput::Day(date!(2024 - 01 - 01)), "Nowhere/Special"),
            Err(Error::InvalidTimezone("Nowhere/Special".to_owned()))
        );
    }
}
