use std::time::Duration;

/// Character budget for task output stored in a run result.
pub const OUTPUT_LIMIT: usize = 1000;

/// Truncates task output to the storage budget, appending "..." when cut.
/// Output at or under the budget is returned unchanged.
pub fn truncate_output(output: &str) -> String {
    if output.chars().count() <= OUTPUT_LIMIT {
        return output.to_string();
    }
    let mut truncated: String = output.chars().take(OUTPUT_LIMIT).collect();
    truncated.push_str("...");
    truncated
}

/// Converts a Duration to a human-readable string with at most 2 units
/// e.g., "1 h, 30 m", "5 m, 20 s", "1 s, 133 ms", "10 ms"
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms == 0 {
        return "0 ms".to_string();
    }

    let components = [
        (total_ms / 86_400_000, "d"),
        (total_ms / 3_600_000 % 24, "h"),
        (total_ms / 60_000 % 60, "m"),
        (total_ms / 1_000 % 60, "s"),
        (total_ms % 1_000, "ms"),
    ];

    components
        .iter()
        .filter(|(amount, _)| *amount > 0)
        .take(2)
        .map(|(amount, unit)| format!("{} {}", amount, unit))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0 ms");
        assert_eq!(format_duration(Duration::from_millis(10)), "10 ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1 s, 500 ms");
        assert_eq!(format_duration(Duration::from_secs(65)), "1 m, 5 s");
        assert_eq!(format_duration(Duration::from_secs(3600 + 120)), "1 h, 2 m");
        assert_eq!(format_duration(Duration::from_secs(86400 + 3600)), "1 d, 1 h");

        // Only the first two non-zero units are shown
        assert_eq!(format_duration(Duration::from_secs(90061)), "1 d, 1 h");
    }

    #[test]
    fn test_truncate_short_output_is_identity() {
        assert_eq!(truncate_output(""), "");
        assert_eq!(truncate_output("all good"), "all good");

        let exactly_at_limit = "x".repeat(OUTPUT_LIMIT);
        assert_eq!(truncate_output(&exactly_at_limit), exactly_at_limit);
    }

    #[test]
    fn test_truncate_long_output() {
        let long = "y".repeat(OUTPUT_LIMIT + 500);
        let stored = truncate_output(&long);
        assert_eq!(stored.len(), OUTPUT_LIMIT + 3);
        assert!(stored.ends_with("..."));
        assert_eq!(&stored[..OUTPUT_LIMIT], &long[..OUTPUT_LIMIT]);
    }

    #[test]
    fn test_truncate_is_idempotent_on_truncated_output() {
        let long = "z".repeat(OUTPUT_LIMIT * 2);
        let once = truncate_output(&long);
        assert_eq!(truncate_output(&once), once);
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        // Multibyte output must not be cut on a byte boundary
        let long = "é".repeat(OUTPUT_LIMIT + 1);
        let stored = truncate_output(&long);
        assert_eq!(stored.chars().count(), OUTPUT_LIMIT + 3);
        assert!(stored.ends_with("..."));
    }
}
