//! Response DTOs for the web API.

use serde::Serialize;
use uuid::Uuid;

use crate::auth::LoginSuccess;
use crate::captcha::ChallengeTicket;
use crate::journal::{Feedback, Post};

/// Bare success acknowledgement.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    /// Always `true`.
    pub success: bool,
}

impl SuccessResponse {
    /// Create a success acknowledgement.
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Login response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Always `true`.
    pub success: bool,
    /// Bearer token for admin requests.
    pub token: String,
    /// Human-readable message.
    pub message: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

impl From<LoginSuccess> for LoginResponse {
    fn from(success: LoginSuccess) -> Self {
        Self {
            success: true,
            token: success.session.token,
            message: "Login successful".to_string(),
            expires_in: success.expires_in_secs,
        }
    }
}

/// Token check response.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Whether the presented token is valid.
    pub authenticated: bool,
}

/// Challenge response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaResponse {
    /// Opaque challenge token to send back with the answer.
    pub token: String,
    /// Challenge kind.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Icon for the kind.
    pub icon: &'static str,
    /// Question text.
    pub question: String,
    /// Answer format hint.
    pub hint: &'static str,
    /// Seconds until the token expires.
    pub expires_in: u64,
}

impl From<ChallengeTicket> for CaptchaResponse {
    fn from(ticket: ChallengeTicket) -> Self {
        Self {
            token: ticket.token,
            kind: ticket.kind.as_str(),
            icon: ticket.icon,
            question: ticket.question,
            hint: ticket.hint,
            expires_in: ticket.expires_in_seconds,
        }
    }
}

/// Journal entry.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    /// Post ID.
    pub id: Uuid,
    /// Entry text.
    pub content: String,
    /// Tags found in the content.
    pub tags: Vec<String>,
    /// Creation timestamp.
    pub date: String,
    /// Last edit timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            content: post.content,
            tags: post.tags,
            date: post.date.to_rfc3339(),
            edited_at: post.edited_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Post listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListResponse {
    /// Matching posts, newest first.
    pub posts: Vec<PostResponse>,
    /// Whether the caller presented a valid admin token.
    pub is_authenticated: bool,
}

/// Single post wrapper.
#[derive(Debug, Serialize)]
pub struct PostEnvelope {
    /// The post.
    pub post: PostResponse,
}

/// Visitor feedback.
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    /// Feedback ID.
    pub id: Uuid,
    /// Message text.
    pub message: String,
    /// Optional rating.
    pub rating: Option<u8>,
    /// Optional emoji.
    pub emoji: Option<String>,
    /// Submission timestamp.
    pub timestamp: String,
}

impl From<Feedback> for FeedbackResponse {
    fn from(feedback: Feedback) -> Self {
        Self {
            id: feedback.id,
            message: feedback.message,
            rating: feedback.rating,
            emoji: feedback.emoji,
            timestamp: feedback.timestamp.to_rfc3339(),
        }
    }
}

/// Feedback listing.
#[derive(Debug, Serialize)]
pub struct FeedbackListResponse {
    /// Feedback, newest first.
    pub feedback: Vec<FeedbackResponse>,
    /// Number of entries.
    pub total: usize,
}

/// Feedback submission acknowledgement.
#[derive(Debug, Serialize)]
pub struct FeedbackAcceptedResponse {
    /// Always `true`.
    pub success: bool,
    /// Thank-you message.
    pub message: String,
}
