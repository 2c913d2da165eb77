//! API error handling for the journeylog web API.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::auth::LoginError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Unauthorized (401).
    Unauthorized,
    /// Not found (404).
    NotFound,
    /// Validation error (422) - for field-level validation errors.
    ValidationError,
    /// Too many requests (429).
    TooManyRequests,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Human-readable message.
    pub error: String,
    /// Error code.
    pub code: ErrorCode,
    /// Set when the client should show a fresh challenge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_captcha: Option<bool>,
    /// Seconds until the client may retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Login attempts left in the current window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    /// Field-level validation error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    require_captcha: bool,
    retry_after: Option<u64>,
    remaining: Option<u32>,
    details: Option<HashMap<String, Vec<String>>>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            require_captcha: false,
            retry_after: None,
            remaining: None,
            details: None,
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a too-many-requests error carrying a retry hint.
    pub fn too_many_requests(message: impl Into<String>, retry_after_secs: u64) -> Self {
        let mut err = Self::new(ErrorCode::TooManyRequests, message);
        err.retry_after = Some(retry_after_secs);
        err
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a validation error from validator::ValidationErrors.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut details: HashMap<String, Vec<String>> = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
                .collect();
            details.insert(field.to_string(), messages);
        }

        let mut err = Self::new(ErrorCode::ValidationError, "Validation failed");
        err.details = Some(details);
        err
    }

    /// Ask the client to present a new challenge.
    pub fn requiring_captcha(mut self) -> Self {
        self.require_captcha = true;
        self
    }

    /// Attach the number of attempts left.
    pub fn with_remaining(mut self, remaining: u32) -> Self {
        self.remaining = Some(remaining);
        self
    }

    /// Error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let retry_after = self.retry_after;
        let body = ErrorBody {
            success: false,
            error: self.message,
            code: self.code,
            require_captcha: self.require_captcha.then_some(true),
            retry_after: self.retry_after,
            remaining: self.remaining,
            details: self.details,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<LoginError> for ApiError {
    fn from(err: LoginError) -> Self {
        let message = err.to_string();
        match err {
            LoginError::RateLimited { retry_after_secs } => {
                ApiError::too_many_requests(message, retry_after_secs)
            }
            LoginError::ChallengeFailed(_) => ApiError::bad_request(message).requiring_captcha(),
            LoginError::MissingPassword => ApiError::bad_request(message),
            LoginError::InvalidCredential { remaining } => {
                ApiError::unauthorized(message).with_remaining(remaining)
            }
        }
    }
}

impl From<crate::JourneyError> for ApiError {
    fn from(err: crate::JourneyError) -> Self {
        match &err {
            crate::JourneyError::Auth(msg) => ApiError::unauthorized(msg.clone()),
            crate::JourneyError::NotFound(_) => ApiError::not_found(err.to_string()),
            crate::JourneyError::Validation(msg) => ApiError::bad_request(msg.clone()),
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captcha::ChallengeError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::ValidationError.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::TooManyRequests.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let err: ApiError = LoginError::RateLimited {
            retry_after_secs: 120,
        }
        .into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "120");

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "TOO_MANY_REQUESTS");
        assert_eq!(json["retryAfter"], 120);
        assert_eq!(
            json["error"],
            "Too many attempts. Please try again in 2 minutes."
        );
        assert!(json.get("remaining").is_none());
    }

    #[tokio::test]
    async fn test_challenge_failed_response() {
        let err: ApiError = LoginError::ChallengeFailed(ChallengeError::Expired).into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["requireCaptcha"], true);
        assert_eq!(json["error"], "CAPTCHA expired. Please refresh.");
    }

    #[tokio::test]
    async fn test_invalid_credential_response() {
        let err: ApiError = LoginError::InvalidCredential { remaining: 3 }.into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid password");
        assert_eq!(json["remaining"], 3);
        assert!(json.get("requireCaptcha").is_none());
    }

    #[test]
    fn test_from_journey_error() {
        let err: ApiError = crate::JourneyError::NotFound("post".to_string()).into();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err: ApiError = crate::JourneyError::Config("boom".to_string()).into();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }
}
