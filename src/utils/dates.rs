use chrono::{Local, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// `YYYY-MM-DD` straight from the calendar fields.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Today's date on the local calendar. Never goes through UTC, which would
/// shift the day for offsets east or west of Greenwich near midnight.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}
