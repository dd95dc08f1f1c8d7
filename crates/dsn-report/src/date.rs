use chrono::{DateTime, NaiveDateTime, Utc};

/// Formats seen in the wild from MTAs that don't quite manage RFC 2822
const WITH_OFFSET: &[&str] = &[
    "%d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M %z",
    "%a %b %e %H:%M:%S %Y %z",
    "%a, %d %b %Y %H:%M:%S%.f %z",
];

const WITHOUT_OFFSET: &[&str] = &["%a, %d %b %Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Remove a trailing comment such as `(PST)` or `(UTC)`
fn strip_trailing_comment(input: &str) -> &str {
    let trimmed = input.trim_end();
    if trimmed.ends_with(')') {
        if let Some(idx) = trimmed.rfind('(') {
            return trimmed[..idx].trim_end();
        }
    }
    trimmed
}

/// Best-effort parse of a date field from a report.
/// Values without a zone offset are taken to be UTC.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = strip_trailing_comment(input.trim());
    if input.is_empty() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(input) {
        return Some(date.into());
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Some(date.into());
    }
    for fmt in WITH_OFFSET {
        if let Ok(date) = DateTime::parse_from_str(input, fmt) {
            return Some(date.into());
        }
    }
    for fmt in WITHOUT_OFFSET {
        if let Ok(date) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(date.and_utc());
        }
    }

    tracing::debug!("unable to parse date {input:?}");
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single()
    }

    #[test]
    fn rfc2822() {
        k9::assert_equal!(
            parse_date("Thu, 7 Jul 1994 17:15:49 -0400"),
            utc(1994, 7, 7, 21, 15, 49)
        );
        k9::assert_equal!(
            parse_date("Wed, 01 Mar 2023 10:11:12 -0800 (PST)"),
            utc(2023, 3, 1, 18, 11, 12)
        );
    }

    #[test]
    fn variants() {
        k9::assert_equal!(
            parse_date("2023-03-01T10:11:12Z"),
            utc(2023, 3, 1, 10, 11, 12)
        );
        k9::assert_equal!(
            parse_date("01 Mar 2023 10:11:12 +0000"),
            utc(2023, 3, 1, 10, 11, 12)
        );
        k9::assert_equal!(
            parse_date("Wed, 01 Mar 2023 10:11:12"),
            utc(2023, 3, 1, 10, 11, 12)
        );
    }

    #[test]
    fn garbage() {
        k9::assert_equal!(parse_date(""), None);
        k9::assert_equal!(parse_date("next tuesday"), None);
    }
}
