pub mod batches;
pub mod format;
pub mod frequency;
pub mod report;
pub mod statistics;

pub use batches::{default_cache_dir, load_and_filter_batches, write_batches};
pub use frequency::{determine_frequency, FrequencyThresholds};
pub use report::{generate_report, ReportContext, ReportSettings};
pub use statistics::generate_statistics;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parses a job's `created_at` into the wall-clock time it carries.
///
/// Offsets (including a trailing `Z`) are accepted but dropped, so
/// `2025-01-06T23:30:00+02:00` compares as `2025-01-06 23:30`.
pub fn parse_created_at(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_created_at_with_zulu_suffix() {
        assert_eq!(
            parse_created_at("2025-01-06T10:15:30Z"),
            Some(at("2025-01-06", "10:15:30"))
        );
    }

    #[test]
    fn test_parse_created_at_keeps_local_wall_clock() {
        assert_eq!(
            parse_created_at("2025-01-06T23:30:00+02:00"),
            Some(at("2025-01-06", "23:30:00"))
        );
    }

    #[test]
    fn test_parse_created_at_naive_forms() {
        let expected = at("2025-01-06", "10:15:30");
        assert_eq!(parse_created_at("2025-01-06T10:15:30.123456").map(|d| d.date()), Some(expected.date()));
        assert_eq!(parse_created_at("2025-01-06 10:15:30"), Some(expected));
        assert_eq!(parse_created_at("2025-01-06"), Some(at("2025-01-06", "00:00:00")));
    }

    #[test]
    fn test_parse_created_at_rejects_garbage() {
        assert_eq!(parse_created_at(""), None);
        assert_eq!(parse_created_at("yesterday"), None);
        assert_eq!(parse_created_at("2025-13-45T00:00:00"), None);
    }
}
