use regex::Regex;
use std::sync::OnceLock;

fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,3})(?:\.\d+)?%").expect("static percent pattern"))
}

/// Last `N%` (or `N.frac%`, truncated) on the line with N in 0..=100.
pub fn extract_percent(line: &str) -> Option<u8> {
    percent_re()
        .captures_iter(line)
        .filter_map(|c| c.get(1)?.as_str().parse::<u8>().ok())
        .filter(|v| *v <= 100)
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bounded_percent() {
        assert_eq!(extract_percent("75% done"), Some(75));
        assert_eq!(extract_percent("  3% 12 + file.bin"), Some(3));
        assert_eq!(extract_percent("0%"), Some(0));
        assert_eq!(extract_percent("100%"), Some(100));
    }

    #[test]
    fn rejects_out_of_range_and_missing() {
        assert_eq!(extract_percent("250%"), None);
        assert_eq!(extract_percent("no percent here"), None);
        assert_eq!(extract_percent("%"), None);
    }

    #[test]
    fn last_match_wins() {
        assert_eq!(extract_percent("10% then 20%"), Some(20));
    }

    #[test]
    fn fractional_percent_truncates() {
        assert_eq!(extract_percent("Downloading depot 441 - 42.50%"), Some(42));
        assert_eq!(extract_percent("99.99%"), Some(99));
    }

    #[test]
    fn long_digit_runs_are_not_split() {
        assert_eq!(extract_percent("1000%"), None);
    }
}
