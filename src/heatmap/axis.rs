use chrono::{Datelike, NaiveDate};

/// Hours between labeled rows on the y axis.
pub const HOUR_TICK_STEP: usize = 6;

/// `(column, label)` for every column that is the first day of a month, labeled
/// with the abbreviated month name.
pub fn month_ticks(dates: &[NaiveDate]) -> Vec<(usize, String)> {
    dates
        .iter()
        .enumerate()
        .filter(|(_, date)| date.day() == 1)
        .map(|(column, date)| (column, date.format("%b").to_string()))
        .collect()
}

/// `(row, label)` for hours 0, 6, 12 and 18, labeled `h0`, `h6`, ...
pub fn hour_ticks() -> Vec<(usize, String)> {
    (0..24)
        .step_by(HOUR_TICK_STEP)
        .map(|hour| (hour, format!("h{hour}")))
        .collect()
}
