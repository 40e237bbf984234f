use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use gymdesk_cache::{rate_limit_key, Cache};
use serde::Serialize;
use std::sync::Arc;

const LOGIN_MAX_ATTEMPTS: i64 = 5;
const LOGIN_WINDOW_SECONDS: usize = 60;

#[derive(Debug, Serialize)]
struct RateLimitError {
    error: String,
    message: String,
    retry_after: u64,
}

/// Extract IP address from request headers
fn extract_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|h| h.to_str().ok()))
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

/// Rate limit middleware for login attempts
/// 5 requests per 60 seconds per IP, counted in a fixed window
pub async fn rate_limit_login(
    State(cache): State<Arc<Cache>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_ip(request.headers());
    let key = rate_limit_key("login", &ip);

    match cache.incr_with_ttl(&key, LOGIN_WINDOW_SECONDS).await {
        Ok(count) if count > LOGIN_MAX_ATTEMPTS => {
            tracing::warn!("Rate limit exceeded for login from IP: {}", ip);
            let retry_after = match cache.ttl(&key).await {
                Ok(ttl) if ttl > 0 => ttl as u64,
                _ => LOGIN_WINDOW_SECONDS as u64,
            };
            Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(RateLimitError {
                    error: "rate_limit_exceeded".to_string(),
                    message: format!(
                        "Too many login attempts. Please try again in {} seconds.",
                        retry_after
                    ),
                    retry_after,
                }),
            )
                .into_response())
        }
        Ok(_) => Ok(next.run(request).await),
        Err(e) => {
            tracing::error!("Rate limit check error: {}", e);
            // On error, allow the request (fail open)
            Ok(next.run(request).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(extract_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn test_extract_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(extract_ip(&headers), "198.51.100.4");
    }

    #[test]
    fn test_extract_ip_unknown_without_headers() {
        let headers = HeaderMap::new();
        assert_eq!(extract_ip(&headers), "unknown");
    }
}
