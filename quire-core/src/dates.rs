use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Datetime layouts accepted in frontmatter, tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Date-only layouts, tried after the datetime ones.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d", "%d/%m/%Y"];

/// The sentinel used for missing or unparseable dates: `0001-01-01T00:00:00`.
pub fn unknown_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .unwrap_or_default()
        .and_time(NaiveTime::default())
}

pub fn is_unknown(date: &NaiveDateTime) -> bool {
    *date == unknown_date()
}

/// Parse a date the way legacy exports write them. Never fails; anything we
/// can't make sense of becomes [`unknown_date`].
pub fn parse_date(input: &str) -> NaiveDateTime {
    let input = input.trim();
    if input.is_empty() {
        return unknown_date();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return dt.naive_local();
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return dt;
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return date.and_time(NaiveTime::default());
        }
    }

    log::debug!("Unrecognized date '{}', treating as unknown", input);
    unknown_date()
}

/// `YYYY-MM-DD`, or `None` for the unknown date.
pub fn ymd(date: &NaiveDateTime) -> Option<String> {
    if is_unknown(date) {
        None
    } else {
        Some(date.format("%Y-%m-%d").to_string())
    }
}
