//! Query string parsing

use percent_encoding::percent_decode_str;
use std::collections::HashMap;

/// Parse a raw query string into name/value pairs
///
/// Each `&`-separated parameter is split at its first `=` only, so `a=b=c` yields `b=c`.
/// A parameter without `=` maps to an empty string. Names and values are percent-decoded;
/// `+` is kept as-is. When a name repeats, the last value wins.
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .unwrap_or_default()
        .split('&')
        .filter(|param| !param.is_empty())
        .map(|param| {
            let (name, value) = param.split_once('=').unwrap_or((param, ""));
            (decode(name), decode(value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_filename() {
        let params = parse_query(Some("path=/tmp/x&filename=a.txt"));
        assert_eq!(params.get("path").map(String::as_str), Some("/tmp/x"));
        assert_eq!(params.get("filename").map(String::as_str), Some("a.txt"));
    }

    #[test]
    fn test_missing_value() {
        let params = parse_query(Some("path=/tmp&filename"));
        assert_eq!(params.get("filename").map(String::as_str), Some(""));
        let params = parse_query(Some("path=/tmp&filename="));
        assert_eq!(params.get("filename").map(String::as_str), Some(""));
    }

    #[test]
    fn test_first_equals_only() {
        let params = parse_query(Some("filename=a=b.txt"));
        assert_eq!(params.get("filename").map(String::as_str), Some("a=b.txt"));
    }

    #[test]
    fn test_percent_decoding() {
        let params = parse_query(Some("path=%2Ftmp%2Fmy%20dir&filename=r%C3%A9sum%C3%A9+1.pdf"));
        assert_eq!(params.get("path").map(String::as_str), Some("/tmp/my dir"));
        assert_eq!(params.get("filename").map(String::as_str), Some("résumé+1.pdf"));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let params = parse_query(Some("path=/a&path=/b"));
        assert_eq!(params.get("path").map(String::as_str), Some("/b"));
    }

    #[test]
    fn test_empty_query() {
        assert!(parse_query(None).is_empty());
        assert!(parse_query(Some("")).is_empty());
        assert!(parse_query(Some("&&")).is_empty());
    }
}
