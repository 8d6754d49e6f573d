use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Parse an auction date as published: `"YYYY-MM-DD"` or `"YYYY-MM-DDTHH:MM:SS"`.
pub fn parse_auction_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = s.parse::<NaiveDateTime>() {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Parse a listing file name date, `"YYYYMMDD"`.
pub fn parse_compact_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}
