//! `Accept` header negotiation over the four token media types

use axum::http::{header::ACCEPT, HeaderMap};

use crate::error::{ServerError, ServerResult};
use crate::statuslist::TokenFormat;

/// Pick the format for a token read
///
/// Unsupported ranges are ignored; supported ones rank by q-value, then by
/// specificity, then by order. No supported range means JWT, as does a
/// wildcard that covers it. An unparsable header is an error.
pub fn negotiate(headers: &HeaderMap) -> ServerResult<TokenFormat> {
    let mut best: Option<(u16, u8, TokenFormat)> = None;

    for value in headers.get_all(ACCEPT) {
        let text = value
            .to_str()
            .map_err(|_| ServerError::UnsupportedMediaType("<non-ascii>".into()))?;

        for range in text.split(',').map(str::trim).filter(|r| !r.is_empty()) {
            let (media, q) = parse_range(range)?;
            if q == 0 {
                continue;
            }
            let candidate = match media.as_str() {
                "*/*" => (q, 0, TokenFormat::Jwt),
                "application/*" => (q, 1, TokenFormat::Jwt),
                other => match TokenFormat::from_media_type(other) {
                    Some(format) => (q, 2, format),
                    None => continue,
                },
            };
            let better = best.map_or(true, |(bq, bs, _)| (candidate.0, candidate.1) > (bq, bs));
            if better {
                best = Some(candidate);
            }
        }
    }

    Ok(best.map_or(TokenFormat::Jwt, |(_, _, format)| format))
}

/// Split `type/subtype;q=0.8;x=y` into the lowercase media type and q in thousandths
fn parse_range(range: &str) -> ServerResult<(String, u16)> {
    let unsupported = || ServerError::UnsupportedMediaType(range.to_string());

    let mut parts = range.split(';').map(str::trim);
    let media = parts.next().unwrap_or_default().to_ascii_lowercase();
    match media.split_once('/') {
        Some((t, s)) if !t.is_empty() && !s.is_empty() && !s.contains('/') => {}
        _ => return Err(unsupported()),
    }

    let mut q = 1000;
    for param in parts {
        let Some((name, value)) = param.split_once('=') else {
            return Err(unsupported());
        };
        if name.trim().eq_ignore_ascii_case("q") {
            let parsed: f32 = value.trim().parse().map_err(|_| unsupported())?;
            if !(0.0..=1.0).contains(&parsed) {
                return Err(unsupported());
            }
            q = (parsed * 1000.0).round() as u16;
        }
    }
    Ok((media, q))
}
