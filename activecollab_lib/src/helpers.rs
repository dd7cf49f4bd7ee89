//! Helpers for permalink parsing and the API's datetime wire format.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use url::Url;

/// Wire format the API uses for datetime parameters (`starts_on`, `due_on`).
const API_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a datetime the way the API expects its parameters.
pub fn format_api_datetime(datetime: DateTime<Utc>) -> String {
    datetime.format(API_DATETIME_FORMAT).to_string()
}

/// Parse `YYYY-MM-DD HH:MM:SS`, a bare `YYYY-MM-DD`, or RFC 3339 into UTC.
pub fn parse_api_datetime(input: &str) -> Result<DateTime<Utc>, String> {
    let input = input.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, API_DATETIME_FORMAT) {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(input)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| format!("invalid datetime {:?}: {}", input, e))
}

/// Extract the project slug from a permalink's `path_info` query parameter.
///
/// The project listing does not return slugs, but some endpoints are
/// addressed by slug; permalinks look like
/// `https://host/public/index.php?path_info=projects%2Fmy-project&...` and
/// the slug is the second `path_info` segment.
pub fn slug_from_permalink(permalink: &str) -> Option<String> {
    let parsed = Url::parse(permalink).ok()?;
    let path_info = parsed
        .query_pairs()
        .find(|(key, _)| key == "path_info")
        .map(|(_, value)| value.into_owned())?;
    let mut segments = path_info.split('/');
    segments.next();
    segments
        .next()
        .filter(|slug| !slug.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_matches_api_wire_format() {
        let dt = Utc.with_ymd_and_hms(2011, 12, 20, 8, 30, 0).unwrap();
        assert_eq!(format_api_datetime(dt), "2011-12-20 08:30:00");
    }

    #[test]
    fn parse_accepts_wire_format_and_bare_dates() {
        let dt = parse_api_datetime("2011-12-20 08:30:00").unwrap();
        assert_eq!(format_api_datetime(dt), "2011-12-20 08:30:00");
        let dt = parse_api_datetime("2011-12-20").unwrap();
        assert_eq!(format_api_datetime(dt), "2011-12-20 00:00:00");
        let dt = parse_api_datetime("2011-12-20T08:30:00Z").unwrap();
        assert_eq!(format_api_datetime(dt), "2011-12-20 08:30:00");
        assert!(parse_api_datetime("next tuesday").is_err());
    }

    #[test]
    fn slug_from_permalink_reads_path_info() {
        let permalink = "https://ac.example.com/public/index.php?path_info=projects%2Facme-site&foo=1";
        assert_eq!(
            slug_from_permalink(permalink),
            Some("acme-site".to_string())
        );
        let unencoded = "https://ac.example.com/public/index.php?path_info=projects/acme-site";
        assert_eq!(
            slug_from_permalink(unencoded),
            Some("acme-site".to_string())
        );
    }

    #[test]
    fn slug_from_permalink_handles_missing_pieces() {
        assert_eq!(slug_from_permalink("not a url"), None);
        assert_eq!(
            slug_from_permalink("https://ac.example.com/public/index.php?foo=1"),
            None
        );
        assert_eq!(
            slug_from_permalink("https://ac.example.com/public/index.php?path_info=projects"),
            None
        );
    }
}
