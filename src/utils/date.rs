//! `YYYY-MM-DD` date keys used to name historical snapshots.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

/// Bare date key. Shape only; calendar validity is not checked.
static DATE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid regex"));

/// Historical snapshot file name.
static SNAPSHOT_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2})\.json$").expect("valid regex"));

/// True if `value` has the exact `YYYY-MM-DD` shape.
pub fn is_date_key(value: &str) -> bool {
    DATE_KEY.is_match(value)
}

/// Date key for a calendar date.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// File name of the historical snapshot for `key`.
pub fn snapshot_file_name(key: &str) -> String {
    format!("{key}.json")
}

/// Date key of a historical snapshot file name, if it is one.
pub fn date_from_file_name(file_name: &str) -> Option<&str> {
    SNAPSHOT_FILE
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_date_key() {
        assert!(is_date_key("2024-01-02"));
        // Shape only.
        assert!(is_date_key("2024-13-40"));
        assert!(!is_date_key("2024-1-02"));
        assert!(!is_date_key("2024-01-02 "));
        assert!(!is_date_key("../etc/passwd"));
        assert!(!is_date_key(""));
        assert!(!is_date_key("٢٠٢٤-٠١-٠٢"));
    }

    #[test]
    fn test_date_key() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(date_key(date), "2024-03-09");
    }

    #[test]
    fn test_date_from_file_name() {
        assert_eq!(date_from_file_name("2024-01-02.json"), Some("2024-01-02"));
        assert_eq!(date_from_file_name("manifest.json"), None);
        assert_eq!(date_from_file_name("notes.txt"), None);
        assert_eq!(date_from_file_name("2024-01-02.json.tmp"), None);
        assert_eq!(date_from_file_name("x2024-01-02.json"), None);
    }

    #[test]
    fn test_snapshot_file_name() {
        assert_eq!(snapshot_file_name("2024-01-02"), "2024-01-02.json");
    }
}
