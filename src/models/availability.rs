use std::collections::HashMap;

use chrono::Weekday;

/// A user's weekly free-time configuration as raw window strings.
///
/// Window strings keep the exact `"HH:MM-HH:MM"` text the settings surface
/// stored so the round trip back to the UI is lossless; parsing happens at
/// the scheduling boundary, where a malformed entry only costs that day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklyAvailability {
    pub weekday_rules: HashMap<Weekday, String>,
    pub blocked_window: Option<String>,
}

impl WeeklyAvailability {
    pub fn rule_for(&self, weekday: Weekday) -> Option<&str> {
        self.weekday_rules.get(&weekday).map(String::as_str)
    }
}

/// Storage key for a weekday. The enum is the internal identity; the
/// lowercase English name exists only at the persistence boundary.
pub fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub fn parse_weekday_key(value: &str) -> Option<Weekday> {
    match value {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
