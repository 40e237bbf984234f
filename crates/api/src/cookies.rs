use axum::http::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use gymdesk_auth::AuthResponse;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const SESSION_ID_COOKIE: &str = "session_id";

/// Build one Set-Cookie value. All auth cookies are HttpOnly and strict
/// same-site; JavaScript never sees a token.
pub fn build_cookie(name: &str, value: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, value, max_age_seconds
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_cookie(name: &str, secure: bool) -> String {
    build_cookie(name, "", 0, secure)
}

/// Set-Cookie values for a fresh login or a rotated session. The refresh
/// and session-id cookies share the refresh token's lifetime.
pub fn auth_cookies(response: &AuthResponse, refresh_ttl_seconds: i64, secure: bool) -> [String; 3] {
    [
        build_cookie(
            ACCESS_TOKEN_COOKIE,
            &response.access_token,
            response.expires_in,
            secure,
        ),
        build_cookie(
            REFRESH_TOKEN_COOKIE,
            &response.refresh_token,
            refresh_ttl_seconds,
            secure,
        ),
        build_cookie(
            SESSION_ID_COOKIE,
            &response.session_id,
            refresh_ttl_seconds,
            secure,
        ),
    ]
}

/// Set-Cookie values that clear all three auth cookies at once
pub fn clear_auth_cookies(secure: bool) -> [String; 3] {
    [
        clear_cookie(ACCESS_TOKEN_COOKIE, secure),
        clear_cookie(REFRESH_TOKEN_COOKIE, secure),
        clear_cookie(SESSION_ID_COOKIE, secure),
    ]
}

/// Append Set-Cookie headers to an outgoing response
pub fn apply_cookies(headers: &mut HeaderMap, cookies: &[String]) {
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            headers.append(SET_COOKIE, value);
        }
    }
}

/// Read a single cookie from a request's Cookie header
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let header = headers.get(COOKIE)?.to_str().ok()?;
    let prefix = format!("{}=", name);

    header
        .split(';')
        .map(|part| part.trim())
        .find_map(|part| part.strip_prefix(prefix.as_str()))
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_format() {
        let cookie = build_cookie("access_token", "abc123", 3600, false);
        assert_eq!(
            cookie,
            "access_token=abc123; HttpOnly; SameSite=Strict; Path=/; Max-Age=3600"
        );

        let secure = build_cookie("access_token", "abc123", 3600, true);
        assert!(secure.ends_with("; Secure"));
    }

    #[test]
    fn test_clearing_zeroes_all_three() {
        let cleared = clear_auth_cookies(false);
        assert_eq!(cleared.len(), 3);
        for cookie in &cleared {
            assert!(cookie.contains("Max-Age=0"));
            assert!(cookie.contains("=; "));
        }
        assert!(cleared[0].starts_with("access_token="));
        assert!(cleared[1].starts_with("refresh_token="));
        assert!(cleared[2].starts_with("session_id="));
    }

    #[test]
    fn test_cookie_value_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("access_token=tok1; session_id=abc; refresh_token=tok2"),
        );

        assert_eq!(cookie_value(&headers, "access_token"), Some("tok1"));
        assert_eq!(cookie_value(&headers, "session_id"), Some("abc"));
        assert_eq!(cookie_value(&headers, "refresh_token"), Some("tok2"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_cookie_value_ignores_lookalike_names() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("session_id_old=stale; session_id=live"),
        );

        assert_eq!(cookie_value(&headers, "session_id"), Some("live"));
    }

    #[test]
    fn test_empty_cookie_reads_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("access_token="));

        assert_eq!(cookie_value(&headers, "access_token"), None);
        assert_eq!(cookie_value(&HeaderMap::new(), "access_token"), None);
    }
}
