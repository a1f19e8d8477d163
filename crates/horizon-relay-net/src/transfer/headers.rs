//! Header maps and cache-hint parsing.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

/// An ordered, case-preserving map of response headers.
///
/// Lookups are case-insensitive. Repeated headers are folded into a single
/// entry with their values joined by `", "`, keeping the position and
/// spelling of the first occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: Vec<(String, String)>,
}

impl ResponseHeaders {
    /// Create an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, folding it into an existing entry of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Get a header value by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Check whether a header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of distinct headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for ResponseHeaders {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl From<&http::HeaderMap> for ResponseHeaders {
    fn from(map: &http::HeaderMap) -> Self {
        map.iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }
}

/// Parse an HTTP date in any of the forms RFC 9110 allows, or RFC 3339.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(&Utc));
    }
    // RFC 850 and asctime forms.
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// The `Expires` header as a UTC instant, or the minimum instant.
pub fn expiration(headers: &ResponseHeaders) -> DateTime<Utc> {
    headers
        .get("Expires")
        .and_then(parse_http_date)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// The refresh-hint header as a UTC instant, or the minimum instant.
///
/// Accepts a date, or a number of seconds relative to `downloaded_at`.
pub fn attempt_refresh_at(
    headers: &ResponseHeaders,
    header_name: &str,
    downloaded_at: DateTime<Utc>,
) -> DateTime<Utc> {
    let Some(value) = headers.get(header_name) else {
        return DateTime::<Utc>::MIN_UTC;
    };
    if let Ok(seconds) = value.trim().parse::<i64>() {
        return TimeDelta::try_seconds(seconds)
            .and_then(|delta| downloaded_at.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
    }
    parse_http_date(value).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
