use once_cell::sync::Lazy;
use regex::Regex;

const ISSUE_TRACKER_URL: &str = "https://issues.redhat.com/browse/";

static CILAB_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CILAB-(\d+)").expect("valid CILAB pattern"));

/// `value / total` as a percentage with two decimals, or `"0%"` for an empty total.
#[allow(clippy::cast_precision_loss)]
pub fn format_percentage(value: usize, total: usize) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", value as f64 / total as f64 * 100.0)
}

/// Share of failed plus errored jobs, formatted like [`format_percentage`].
pub fn format_failure_rate(failure: usize, error: usize, total: usize) -> String {
    format_percentage(failure + error, total)
}

/// Minutes with one decimal below an hour, hours with two decimals otherwise.
pub fn format_duration(seconds: f64) -> String {
    let hours = seconds / 3600.0;
    if hours < 1.0 {
        format!("{:.1} minutes", seconds / 60.0)
    } else {
        format!("{hours:.2} hours")
    }
}

/// Thousands-separated integer, e.g. `12,345`.
pub fn format_count(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Cuts `text` to `max_chars` characters, appending `...` when anything was cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Rewrites every `CILAB-<n>` reference into an issue tracker URL.
pub fn link_issue_references(text: &str) -> String {
    CILAB_REFERENCE
        .replace_all(text, format!("{ISSUE_TRACKER_URL}CILAB-$1").as_str())
        .into_owned()
}

/// Free text as it appears in the report: truncated, then linked.
pub fn display_text(text: &str, max_chars: usize) -> String {
    link_issue_references(&truncate(text, max_chars))
}

/// Upper-cases the first character and lower-cases the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(50, 100), "50.00%");
        assert_eq!(format_percentage(1, 3), "33.33%");
        assert_eq!(format_percentage(0, 100), "0.00%");
        assert_eq!(format_percentage(100, 100), "100.00%");
    }

    #[test]
    fn test_format_percentage_zero_total() {
        assert_eq!(format_percentage(10, 0), "0%");
    }

    #[test]
    fn test_format_failure_rate() {
        assert_eq!(format_failure_rate(15, 5, 100), "20.00%");
        assert_eq!(format_failure_rate(5, 5, 100), "10.00%");
        assert_eq!(format_failure_rate(0, 0, 100), "0.00%");
        assert_eq!(format_failure_rate(0, 0, 0), "0%");
    }

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration(30.0), "0.5 minutes");
        assert_eq!(format_duration(60.0), "1.0 minutes");
        assert_eq!(format_duration(90.0), "1.5 minutes");
    }

    #[test]
    fn test_format_duration_hours() {
        assert_eq!(format_duration(3600.0), "1.00 hours");
        assert_eq!(format_duration(5400.0), "1.50 hours");
        assert_eq!(format_duration(7200.0), "2.00 hours");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("this is too long", 7), "this is...");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("ééééé", 2), "éé...");
    }

    #[test]
    fn test_link_issue_references() {
        assert_eq!(
            link_issue_references("Known issue CILAB-1234, see also CILAB-7"),
            "Known issue https://issues.redhat.com/browse/CILAB-1234, see also https://issues.redhat.com/browse/CILAB-7"
        );
        assert_eq!(link_issue_references("no reference"), "no reference");
        assert_eq!(link_issue_references("CILAB-abc"), "CILAB-abc");
    }

    #[test]
    fn test_display_text_truncates_before_linking() {
        let reason = format!("{} CILAB-42", "x".repeat(10));
        assert_eq!(
            display_text(&reason, 100),
            format!("{} https://issues.redhat.com/browse/CILAB-42", "x".repeat(10))
        );
        assert_eq!(display_text(&reason, 5), "xxxxx...");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("success"), "Success");
        assert_eq!(capitalize("FAILURE"), "Failure");
        assert_eq!(capitalize(""), "");
    }
}
