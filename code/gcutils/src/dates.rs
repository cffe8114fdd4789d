/// Timestamp tokens as they appear in the decorations of a unified JVM log line.
///
/// Two encodings are in use:
///
///  - uptime, `[12.345s]`: seconds since the JVM started, passed through as a float
///  - wall clock, `[2025-07-01T12:34:56.789+0200]`: an ISO-8601-like instant with a numeric offset
///    (`+hhmm` or `+hh:mm`) or a trailing `Z`, converted to seconds since the Unix epoch
///
/// Conversion never fails.  A token that can't be understood yields 0.0, which callers treat as
/// a sentinel rather than as a time.
use chrono::DateTime;
use std::str::FromStr;

/// The value returned for a token that could not be converted.

pub const TIMESTAMP_SENTINEL: f64 = 0.0;

/// Convert either encoding to a float number of seconds.  The `s` suffix of the uptime encoding
/// is optional.

pub fn parse_timestamp(token: &str) -> f64 {
    let token = token.trim();
    if token.contains('T') {
        parse_wallclock(token).unwrap_or(TIMESTAMP_SENTINEL)
    } else {
        parse_uptime(token).unwrap_or(TIMESTAMP_SENTINEL)
    }
}

/// Seconds since the epoch for a wall-clock token, or None.

pub fn parse_wallclock(token: &str) -> Option<f64> {
    let normalized = normalize_offset(token);
    let t = DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f%z").ok()?;
    Some(t.timestamp() as f64 + t.timestamp_subsec_nanos() as f64 / 1e9)
}

/// Seconds for an uptime token, or None.  Infinities and NaN are rejected.

pub fn parse_uptime(token: &str) -> Option<f64> {
    let digits = token.strip_suffix('s').unwrap_or(token);
    match f64::from_str(digits) {
        Ok(n) if n.is_finite() => Some(n),
        _ => None,
    }
}

// Rewrite the offset into the `+hhmm` form: `Z` becomes `+0000` and a colon in the offset is
// dropped.  Anything else is passed through and left for the parser to reject.
fn normalize_offset(token: &str) -> String {
    if let Some(rest) = token.strip_suffix('Z') {
        return format!("{rest}+0000");
    }
    let bytes = token.as_bytes();
    let n = bytes.len();
    if n >= 6 && (bytes[n - 6] == b'+' || bytes[n - 6] == b'-') && bytes[n - 3] == b':' {
        let mut s = token[..n - 3].to_string();
        s.push_str(&token[n - 2..]);
        return s;
    }
    token.to_string()
}

#[test]
fn test_uptime() {
    assert!(parse_timestamp("12.345s") == 12.345);
    assert!(parse_timestamp("0.010") == 0.010);
    assert!(parse_timestamp("inf") == TIMESTAMP_SENTINEL);
    assert!(parse_timestamp("twelve") == TIMESTAMP_SENTINEL);
}

#[test]
fn test_wallclock() {
    let a = parse_timestamp("2025-07-01T12:00:00.000+0000");
    let b = parse_timestamp("2025-07-01T12:00:00.000Z");
    let c = parse_timestamp("2025-07-01T14:00:00.000+02:00");
    let d = parse_timestamp("2025-07-01T14:00:00.000+0200");
    assert!(a == 1751371200.0);
    assert!(a == b && b == c && c == d);

    let e = parse_timestamp("2025-07-01T12:00:01.250+0000");
    assert!((e - a - 1.25).abs() < 1e-6);
}

#[test]
fn test_wallclock_soft_failure() {
    assert!(parse_timestamp("2025-13-01T12:00:00.000+0000") == TIMESTAMP_SENTINEL);
    assert!(parse_timestamp("2025-07-01T12:00:00.000") == TIMESTAMP_SENTINEL);
    assert!(parse_timestamp("T") == TIMESTAMP_SENTINEL);
}
