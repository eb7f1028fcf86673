use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

pub fn is_valid_email(string: &str) -> bool {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?m)^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .unwrap()
    });
    RE.is_match(string)
}

/// Accepts full RFC 3339 timestamps as well as the shorter forms emitted by
/// `datetime-local` inputs. Offsets are discarded; everything is naive UTC.
pub fn parse_date_time(string: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(string) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(string, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(string, "%Y-%m-%dT%H:%M"))
        .ok()
}
