use chrono::{DateTime, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `Monday May, 21, 2035 at 9:30PM`
    Full,
    /// `Mon 05, 21, 2035 9:30PM`
    Medium,
    /// Value for a `datetime-local` input.
    Input,
}

impl DateFormat {
    fn pattern(&self) -> &'static str {
        match self {
            DateFormat::Full => "%A %B, %-d, %Y at %-I:%M%p",
            DateFormat::Medium => "%a %m, %d, %Y %-I:%M%p",
            DateFormat::Input => "%Y-%m-%dT%H:%M",
        }
    }
}

pub fn format_datetime(value: DateTime<Utc>, tz: Tz, format: DateFormat) -> String {
    value.with_timezone(&tz).format(format.pattern()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_full_and_medium_in_display_zone() {
        let start = Utc.with_ymd_and_hms(2035, 5, 22, 4, 30, 0).unwrap();
        let tz = chrono_tz::America::Los_Angeles;
        assert_eq!(
            format_datetime(start, tz, DateFormat::Full),
            "Monday May, 21, 2035 at 9:30PM"
        );
        assert_eq!(
            format_datetime(start, tz, DateFormat::Medium),
            "Mon 05, 21, 2035 9:30PM"
        );
        assert_eq!(
            format_datetime(start, Tz::UTC, DateFormat::Input),
            "2035-05-22T04:30"
        );
    }
}
