//! Request body extraction and field validators.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::web::error::ApiError;

/// JSON body that has passed its `Validate` rules.
///
/// Malformed or mistyped JSON is a 400 with a generic message; a body that
/// parses but breaks a field rule is a 422 listing the offending fields.
///
/// ```ignore
/// async fn create_post(ValidatedJson(req): ValidatedJson<PostRequest>) -> StatusCode {
///     // req.content is non-blank and within bounds here
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = match Json::<T>::from_request(req, state).await {
            Ok(Json(body)) => body,
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Rejected request body");
                return Err(ApiError::bad_request("Invalid request body"));
            }
        };

        body.validate().map_err(ApiError::from_validation_errors)?;
        Ok(ValidatedJson(body))
    }
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// Reject text carrying control characters other than line breaks and tabs.
pub fn no_control_chars(value: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| matches!(c, '\n' | '\r' | '\t');
    match value.chars().find(|&c| c.is_control() && !allowed(c)) {
        Some(_) => Err(rule(
            "no_control_chars",
            "Must not contain control characters",
        )),
        None => Ok(()),
    }
}

/// Reject text that is blank once surrounding whitespace is removed.
pub fn not_empty_trimmed(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(rule("not_empty_trimmed", "Must not be empty"));
    }
    Ok(())
}

/// Accept a single reaction token: no whitespace or control characters.
pub fn compact_reaction(value: &str) -> Result<(), ValidationError> {
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(rule(
            "compact_reaction",
            "Reaction must be a single emoji without spaces",
        ));
    }
    Ok(())
}
