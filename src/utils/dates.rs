use chrono::{Days, NaiveDate};

/// `today` followed by the `days_back` preceding calendar days, newest first
pub fn trailing_days(today: NaiveDate, days_back: u64) -> Vec<NaiveDate> {
    (0..=days_back)
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .collect()
}

/// ISO-8601 day string used in API URLs and chart titles
pub fn iso_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Compact `DD/MM` label for the chart's X axis
pub fn short_day_month(date: NaiveDate) -> String {
    date.format("%d/%m").to_string()
}
