//! Lookup of UTC offsets for the server's configured local timezone.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// Get the current UTC offset of `canonical_timezone`, e.g. "Pacific/Auckland".
///
/// Returns `None` if the timezone name is not a known canonical timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    get_offset_at(canonical_timezone, OffsetDateTime::now_utc())
}

/// Get the UTC offset of `canonical_timezone` in effect on `date`.
///
/// The offset is sampled at midday UTC so that dates either side of a daylight
/// saving change resolve to the offset used for most of that day.
pub fn get_offset_on(canonical_timezone: &str, date: Date) -> Option<UtcOffset> {
    get_offset_at(canonical_timezone, date.midnight().assume_utc() + time::Duration::hours(12))
}

fn get_offset_at(canonical_timezone: &str, instant: OffsetDateTime) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&instant).to_utc())
}
