//! Request DTOs for the web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::{compact_reaction, no_control_chars, not_empty_trimmed};

/// Maximum length of a journal entry.
pub const MAX_POST_LENGTH: u64 = 5000;

/// Maximum length of a feedback message.
pub const MAX_FEEDBACK_LENGTH: u64 = 500;

/// Login request.
///
/// Every field is optional so a missing password is reported by the login
/// flow after the rate limit has counted the attempt.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Admin password.
    #[serde(default)]
    pub password: Option<String>,
    /// Token from `GET /api/captcha`.
    #[serde(default)]
    pub captcha_token: Option<String>,
    /// Answer to the challenge.
    #[serde(default)]
    pub captcha_answer: Option<String>,
}

/// Create or update a journal entry.
#[derive(Debug, Deserialize, Validate)]
pub struct PostRequest {
    /// Entry text.
    #[validate(
        length(min = 1, max = 5000, message = "Content must be 1-5000 characters"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars")
    )]
    pub content: String,
}

/// Query parameters for listing posts.
#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    /// Free-text search over content and tags.
    #[serde(default)]
    pub search: Option<String>,
    /// Exact tag filter.
    #[serde(default)]
    pub tag: Option<String>,
}

/// Submit visitor feedback.
#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackRequest {
    /// Feedback text.
    #[validate(
        length(min = 1, max = 500, message = "Message required (max 500 chars)"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars")
    )]
    pub message: String,
    /// Optional 1-5 rating.
    #[serde(default)]
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<u8>,
    /// Optional emoji reaction.
    #[serde(default)]
    #[validate(
        length(max = 16, message = "Emoji is too long"),
        custom(function = "compact_reaction")
    )]
    pub emoji: Option<String>,
}
