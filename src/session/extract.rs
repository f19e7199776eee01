use axum::http::{header, HeaderMap};

/// Name of the cookie carrying the refresh token
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Reads the token from an `Authorization: <scheme> <token>` header.
///
/// Any other shape yields an empty string; verification of an empty token
/// fails, so callers end up returning `Unauthorized`.
pub fn extract_bearer(headers: &HeaderMap) -> String {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    else {
        return String::new();
    };

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        [_scheme, token] => token.to_string(),
        _ => String::new(),
    }
}

/// Reads the named cookie, or an empty string when it is missing
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> String {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}
