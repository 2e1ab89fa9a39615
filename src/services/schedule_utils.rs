use chrono::{NaiveTime, Timelike};
use serde_json::json;

use crate::error::{AppError, AppResult};

const TIME_FORMAT: &str = "%H:%M";

/// A clock-time range within a single day, parsed from the persisted
/// `"HH:MM-HH:MM"` settings format. The textual form must round-trip
/// losslessly for the settings surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn parse(value: &str) -> AppResult<Self> {
        let (start_raw, end_raw) = value.split_once('-').ok_or_else(|| {
            AppError::validation_with_details(
                "time window must use the HH:MM-HH:MM format",
                json!({"value": value}),
            )
        })?;
        let start = parse_time(start_raw)?;
        let end = parse_time(end_raw)?;
        if end <= start {
            return Err(AppError::validation_with_details(
                "time window end must be after its start",
                json!({"value": value}),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn format(&self) -> String {
        format!(
            "{}-{}",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

pub fn parse_time(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "invalid clock time",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn minutes_from_midnight(time: NaiveTime) -> i64 {
    (time.hour() as i64) * 60 + (time.minute() as i64)
}

/// Inverse of `minutes_from_midnight` for in-day values.
pub fn time_from_minutes(total_minutes: i64) -> NaiveTime {
    let hours = (total_minutes / 60) as u32;
    let minutes = (total_minutes % 60) as u32;
    NaiveTime::from_hms_opt(hours, minutes, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).expect("00:00 must be valid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_a_window_losslessly() {
        let window = TimeWindow::parse("09:00-12:30").expect("window");
        assert_eq!(minutes_from_midnight(window.start), 9 * 60);
        assert_eq!(minutes_from_midnight(window.end), 12 * 60 + 30);
        assert_eq!(window.format(), "09:00-12:30");
    }

    #[test]
    fn rejects_malformed_windows() {
        assert!(TimeWindow::parse("").is_err());
        assert!(TimeWindow::parse("09:00").is_err());
        assert!(TimeWindow::parse("09:00/12:00").is_err());
        assert!(TimeWindow::parse("25:00-26:00").is_err());
        assert!(TimeWindow::parse("abc-def").is_err());
    }

    #[test]
    fn rejects_inverted_and_empty_windows() {
        assert!(TimeWindow::parse("12:00-09:00").is_err());
        assert!(TimeWindow::parse("09:00-09:00").is_err());
    }

    #[test]
    fn overlap_is_exclusive_of_touching_edges() {
        let morning = TimeWindow::parse("09:00-12:00").expect("window");
        let afternoon = TimeWindow::parse("12:00-17:00").expect("window");
        let midday = TimeWindow::parse("11:00-13:00").expect("window");
        assert!(!morning.overlaps(&afternoon));
        assert!(morning.overlaps(&midday));
        assert!(midday.overlaps(&afternoon));
    }

    #[test]
    fn minute_conversions_round_trip() {
        let time = NaiveTime::from_hms_opt(18, 45, 0).expect("time");
        assert_eq!(time_from_minutes(minutes_from_midnight(time)), time);
    }
}
