//! Business day arithmetic.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// The last weekday strictly before `date`. Public holidays are not skipped.
pub fn previous_business_day(date: NaiveDate) -> NaiveDate {
    let mut day = date;
    loop {
        day = match day.checked_sub_days(Days::new(1)) {
            Some(d) => d,
            None => return day,
        };
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            return day;
        }
    }
}
