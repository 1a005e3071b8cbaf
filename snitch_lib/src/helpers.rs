//! Helpers for snitch token extraction and timestamp display.

use chrono::{DateTime, Local, Utc};
use url::Url;

/// Extract a snitch token from either a bare token or a snitch URL.
///
/// Accepts check-in URLs (`https://nosnch.in/c2354d53d2`), API URLs
/// (`https://api.deadmanssnitch.com/v1/snitches/c2354d53d2`) and dashboard
/// URLs (`https://deadmanssnitch.com/snitches/c2354d53d2`). Anything that does
/// not parse as a URL is returned trimmed, as-is.
pub fn token_from_arg(arg: &str) -> Result<String, String> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err("A snitch token is required".to_string());
    }
    let parsed = match Url::parse(arg) {
        Ok(u) => u,
        Err(_) => return Ok(arg.to_string()),
    };
    let segments: Vec<&str> = parsed
        .path()
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let token = match segments.iter().position(|s| *s == "snitches") {
        Some(i) => segments.get(i + 1),
        None if segments.len() == 1 => segments.first(),
        None => None,
    };
    token
        .map(|t| (*t).to_string())
        .ok_or_else(|| format!("Could not find a snitch token in URL: {}", arg))
}

/// Format an ISO 8601 timestamp for display. If `use_utc` is true, shows UTC; otherwise converts to local timezone.
/// On parse failure returns the original string unchanged.
pub fn format_timestamp_display(ts: &str, use_utc: bool) -> String {
    let dt = match parse_time(ts) {
        Ok(d) => d,
        _ => return ts.to_string(),
    };
    if use_utc {
        dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    } else {
        dt.with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string()
    }
}

/// Parse an ISO 8601 time string (with or without a trailing `Z`).
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    chrono::DateTime::parse_from_rfc3339(s)
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(&format!("{}Z", s)))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_passthrough() {
        assert_eq!(token_from_arg(" c2354d53d2 ").unwrap(), "c2354d53d2");
        assert!(token_from_arg("  ").is_err());
    }

    #[test]
    fn token_from_check_in_url() {
        assert_eq!(
            token_from_arg("https://nosnch.in/c2354d53d2").unwrap(),
            "c2354d53d2"
        );
    }

    #[test]
    fn token_from_api_url() {
        assert_eq!(
            token_from_arg("https://api.deadmanssnitch.com/v1/snitches/c2354d53d2/tags").unwrap(),
            "c2354d53d2"
        );
        assert_eq!(
            token_from_arg("https://deadmanssnitch.com/snitches/c2354d53d2").unwrap(),
            "c2354d53d2"
        );
        assert!(token_from_arg("https://deadmanssnitch.com/").is_err());
    }

    #[test]
    fn timestamp_display_utc() {
        assert_eq!(
            format_timestamp_display("2019-04-26T19:08:51.000Z", true),
            "2019-04-26 19:08:51 UTC"
        );
        assert_eq!(
            format_timestamp_display("2019-04-26T19:08:51", true),
            "2019-04-26 19:08:51 UTC"
        );
        assert_eq!(format_timestamp_display("never", true), "never");
    }
}
