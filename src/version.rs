//! Version markers: HTTP `Last-Modified` values as UTC timestamps.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// IMF-fixdate, RFC850, asctime (the three HTTP/1.1 forms).
const HTTP_DATE_FORMATS: [&str; 3] = [
    "%a, %d %b %Y %H:%M:%S GMT",
    "%A, %d-%b-%y %H:%M:%S GMT",
    "%a %b %e %H:%M:%S %Y",
];

/// Parse a Last-Modified value. RFC2822/RFC3339 are accepted as well
/// (some object stores emit offsets instead of "GMT").
pub fn parse_version_marker(raw: &str) -> Result<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(anyhow!("empty last-modified"));
    }
    for fmt in HTTP_DATE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    Err(anyhow!("unparsable last-modified '{}'", s))
}

/// IMF-fixdate, e.g. "Sun, 06 Nov 1994 08:49:37 GMT".
pub fn format_http_date(t: DateTime<Utc>) -> String {
    t.format(HTTP_DATE_FORMATS[0]).to_string()
}
