//! Admin session extraction.
//!
//! [`session_auth`] places the [`Authenticator`] in request extensions; the
//! [`AdminSession`] and [`MaybeAdmin`] extractors read the bearer token and
//! ask the authenticator whether it belongs to the admin.

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{DateTime, Utc};

use crate::auth::Authenticator;
use crate::web::error::ApiError;

/// Proof that the request carries a valid admin token.
///
/// Handlers taking this extractor reject unauthenticated callers with 401.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession {
    /// When the presented token was issued.
    pub issued_at: DateTime<Utc>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state)
            .await
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

        let issued_at = authenticator(parts)?
            .authenticate(&token)
            .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

        Ok(AdminSession { issued_at })
    }
}

/// Whether the caller presented a valid admin token.
///
/// Never rejects; public endpoints use it to tailor their response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaybeAdmin(pub bool);

impl MaybeAdmin {
    /// Whether the caller is the authenticated admin.
    pub fn is_admin(&self) -> bool {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state).await;
        let admin = authenticator(parts)
            .map(|auth| auth.is_authenticated(token.as_deref()))
            .unwrap_or(false);

        Ok(MaybeAdmin(admin))
    }
}

async fn bearer_token<S: Send + Sync>(parts: &mut Parts, state: &S) -> Option<String> {
    TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
        .await
        .ok()
        .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string())
}

fn authenticator(parts: &Parts) -> Result<&Authenticator, ApiError> {
    parts
        .extensions
        .get::<Authenticator>()
        .ok_or_else(|| ApiError::internal("Authenticator not configured"))
}

/// Middleware function to inject the authenticator into request extensions.
pub async fn session_auth(
    authenticator: Authenticator,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(authenticator);
    next.run(request).await
}
