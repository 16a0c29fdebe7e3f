//! Parsing and formatting of `h:m:s` style timestamps.

use crate::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static LAZY_TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:(?P<hour>\d+):)?(?P<minute>\d+):)?(?P<second>\d+(?:\.\d+)?)$")
        .expect("valid regex")
});

/// Parse a timestamp in any of the forms `h:m:s[.frac]`, `m:s[.frac]` or
/// `s[.frac]`.
///
/// Minute and second fields are not range-checked; `1:75` is 135 seconds,
/// which matches how ffmpeg itself accepts durations.
pub fn parse_time_lazy(s: &str) -> Result<Duration> {
    let invalid = || Error::parse_error("time", format!("time string is expected: {s:?}"));

    let caps = LAZY_TIME_PATTERN.captures(s.trim()).ok_or_else(invalid)?;

    let mut total: f64 = caps["second"].parse().map_err(|_| invalid())?;
    if let Some(minute) = caps.name("minute") {
        total += minute.as_str().parse::<f64>().map_err(|_| invalid())? * 60.0;
    }
    if let Some(hour) = caps.name("hour") {
        total += hour.as_str().parse::<f64>().map_err(|_| invalid())? * 3600.0;
    }

    Duration::try_from_secs_f64(total).map_err(|_| invalid())
}

/// Format a duration as `HH:MM:SS.mmm`.
pub fn format_time(duration: Duration) -> String {
    let millis = duration.as_millis();
    let hours = millis / 3_600_000;
    let minutes = (millis / 60_000) % 60;
    let seconds = (millis / 1000) % 60;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_form() {
        assert_eq!(parse_time_lazy("01:02:03.5").unwrap(), Duration::from_millis(3_723_500));
        assert_eq!(parse_time_lazy("00:01:40.00").unwrap(), Duration::from_secs(100));
    }

    #[test]
    fn test_parse_short_forms() {
        assert_eq!(parse_time_lazy("2:30").unwrap(), Duration::from_secs(150));
        assert_eq!(parse_time_lazy("42").unwrap(), Duration::from_secs(42));
        assert_eq!(parse_time_lazy("0.25").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_time_lazy("").is_err());
        assert!(parse_time_lazy("N/A").is_err());
        assert!(parse_time_lazy("1:2:3:4").is_err());
        assert!(parse_time_lazy("-00:00:01").is_err());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(Duration::from_millis(3_723_500)), "01:02:03.500");
        assert_eq!(format_time(Duration::ZERO), "00:00:00.000");
    }
}
