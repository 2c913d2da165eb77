//! Per-client API rate limiting and client identification.

use axum::{
    async_trait,
    body::Body,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use crate::rate_limit::{OperationClass, RateLimiter};
use crate::web::error::ApiError;

/// Resolve the client IP for rate limiting.
///
/// Order: first `X-Forwarded-For` entry, `X-Real-IP`, the socket peer address,
/// then `"unknown"`. Forwarding headers are trusted as-is, so the service is
/// expected to sit behind a proxy that sets them.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(forwarded) = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next().map(str::trim) {
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    if let Some(real_ip) = headers
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return real_ip.to_string();
    }

    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Client IP extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(&parts.headers, &parts.extensions)))
    }
}

/// Rate limiting middleware for the API.
pub async fn api_rate_limit(
    limiter: Arc<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(req.headers(), req.extensions());
    let decision = limiter.check(&ip, OperationClass::Api);

    if !decision.allowed {
        tracing::warn!(ip = %ip, "API rate limit exceeded");
        return ApiError::too_many_requests(
            "Too many requests. Please try again later.",
            decision.retry_after_secs.unwrap_or(0),
        )
        .into_response();
    }

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("X-RateLimit-Remaining", HeaderValue::from(decision.remaining));
    response
}
