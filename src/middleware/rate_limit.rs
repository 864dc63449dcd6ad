use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::cache::{RateLimitExceeded, RateLimitStatus, RateLimiter};
use crate::utils::client_identifier;

pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Serialize)]
struct RateLimitBody {
    error: &'static str,
    message: &'static str,
    #[serde(rename = "retryAfter")]
    retry_after: u64,
}

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let body = Json(RateLimitBody {
            error: "Too many requests",
            message: "Rate limit exceeded. Please try again later.",
            retry_after: self.retry_after_secs,
        });

        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(self.retry_after_secs));
        response
    }
}

fn apply_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(status.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(status.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(status.reset_at_secs()));
}

/// 按客户端标识限流；被拒绝时直接返回 429，不进入后续处理
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, RateLimitExceeded> {
    let identifier = client_identifier(req.headers());

    match limiter.check(&identifier) {
        Ok(status) => {
            let mut response = next.run(req).await;
            apply_headers(response.headers_mut(), &status);
            Ok(response)
        }
        Err(exceeded) => {
            tracing::warn!(
                limiter = limiter.name(),
                client = %identifier,
                retry_after = exceeded.retry_after_secs,
                "rate limit exceeded"
            );
            Err(exceeded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn rejection_has_retry_after_header_and_body() {
        let response = RateLimitExceeded {
            limiter: "ai",
            retry_after_secs: 42,
            reset_at: 0,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");

        let bytes = to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "error": "Too many requests",
                "message": "Rate limit exceeded. Please try again later.",
                "retryAfter": 42,
            })
        );
    }

    #[test]
    fn status_headers_use_epoch_seconds() {
        let mut headers = HeaderMap::new();
        apply_headers(
            &mut headers,
            &RateLimitStatus {
                limit: 100,
                remaining: 99,
                reset_at: 1_700_000_900_500,
            },
        );
        assert_eq!(headers[RATE_LIMIT_LIMIT], "100");
        assert_eq!(headers[RATE_LIMIT_REMAINING], "99");
        assert_eq!(headers[RATE_LIMIT_RESET], "1700000900");
    }
}
