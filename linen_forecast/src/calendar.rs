//! Local calendar helpers
//!
//! Weekdays are indexed Sunday = 0 through Saturday = 6.

use chrono::{
    DateTime, Datelike, Days, FixedOffset, NaiveDate, TimeZone, Timelike, Utc, Weekday,
};

/// Weekdays in index order
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

pub fn weekday_index(day: Weekday) -> usize {
    day.num_days_from_sunday() as usize
}

/// Full English weekday name
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Local calendar date of a timestamp
pub fn local_date(timestamp: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    timestamp.with_timezone(&offset).date_naive()
}

/// Local hour of day (0-23)
pub fn local_hour(timestamp: DateTime<Utc>, offset: FixedOffset) -> u32 {
    timestamp.with_timezone(&offset).hour()
}

/// Local minutes since midnight
pub fn local_minute_of_day(timestamp: DateTime<Utc>, offset: FixedOffset) -> u32 {
    let local = timestamp.with_timezone(&offset);
    local.hour() * 60 + local.minute()
}

/// Timestamp of local midnight at the start of `date`
pub fn start_of_local_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    match offset.from_local_datetime(&date.and_time(chrono::NaiveTime::MIN)).single() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)),
    }
}

/// Whole days from `earlier` to `later` (negative when `later` is before `earlier`)
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// `date` shifted by `days`, saturating at the representable date range
pub fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    let step = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(step).unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(step).unwrap_or(NaiveDate::MIN)
    }
}

/// Calendar month key as (year, month)
pub fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}
