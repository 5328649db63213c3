//! Conditional GET support for token artifacts

use axum::http::{
    header::{IF_MODIFIED_SINCE, IF_NONE_MATCH},
    HeaderMap,
};
use chrono::{DateTime, Utc};

use crate::cache::CachedToken;

/// HTTP-date rendering of an artifact's creation instant
pub fn http_date(token: &CachedToken) -> String {
    let created: DateTime<Utc> = token.created.into();
    created.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// True if the client's copy is current and a 304 should be sent
///
/// `If-None-Match` takes precedence and matches only the exact current
/// ETag; `If-Modified-Since` is consulted only without it.
pub fn is_not_modified(headers: &HeaderMap, token: &CachedToken) -> bool {
    if let Some(value) = headers.get(IF_NONE_MATCH) {
        let Ok(value) = value.to_str() else {
            return false;
        };
        return value.trim() == token.etag();
    }

    let Some(since) = headers
        .get(IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
    else {
        return false;
    };
    // HTTP dates carry whole seconds
    let created_secs = DateTime::<Utc>::from(token.created).timestamp();
    created_secs <= since.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::time::{Duration, UNIX_EPOCH};

    fn token() -> CachedToken {
        CachedToken {
            bytes: b"x".to_vec(),
            created: UNIX_EPOCH + Duration::from_millis(1_700_000_000_500),
        }
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_http_date_format() {
        assert_eq!(http_date(&token()), "Tue, 14 Nov 2023 22:13:20 GMT");
    }

    #[test]
    fn test_matching_etag_is_not_modified() {
        let t = token();
        assert!(is_not_modified(&headers(&[("if-none-match", &t.etag())]), &t));
        assert!(!is_not_modified(&headers(&[("if-none-match", "\"1\"")]), &t));
    }

    #[test]
    fn test_only_exact_etag_matches() {
        let t = token();
        let weak = format!("W/{}", t.etag());
        let listed = format!("\"1\", {}", t.etag());

        assert!(!is_not_modified(&headers(&[("if-none-match", "*")]), &t));
        assert!(!is_not_modified(&headers(&[("if-none-match", &weak)]), &t));
        assert!(!is_not_modified(&headers(&[("if-none-match", &listed)]), &t));
    }

    #[test]
    fn test_if_none_match_takes_precedence() {
        let t = token();
        let h = headers(&[
            ("if-none-match", "\"stale\""),
            ("if-modified-since", "Wed, 15 Nov 2023 00:00:00 GMT"),
        ]);
        assert!(!is_not_modified(&h, &t));
    }

    #[test]
    fn test_if_modified_since() {
        let t = token();
        let later = headers(&[("if-modified-since", "Wed, 15 Nov 2023 00:00:00 GMT")]);
        let same = headers(&[("if-modified-since", "Tue, 14 Nov 2023 22:13:20 GMT")]);
        let earlier = headers(&[("if-modified-since", "Mon, 13 Nov 2023 00:00:00 GMT")]);

        assert!(is_not_modified(&later, &t));
        assert!(is_not_modified(&same, &t));
        assert!(!is_not_modified(&earlier, &t));
    }

    #[test]
    fn test_no_conditions_is_modified() {
        assert!(!is_not_modified(&HeaderMap::new(), &token()));
    }
}
