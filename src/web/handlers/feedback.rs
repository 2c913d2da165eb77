//! Visitor feedback handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::web::dto::{
    FeedbackAcceptedResponse, FeedbackListResponse, FeedbackRequest, ValidatedJson,
};
use crate::web::middleware::AdminSession;

use super::AppState;

/// POST /api/feedback - Submit feedback.
pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<FeedbackRequest>,
) -> (StatusCode, Json<FeedbackAcceptedResponse>) {
    let emoji = req.emoji.filter(|e| !e.trim().is_empty());
    state
        .journal
        .add_feedback(req.message.trim(), req.rating, emoji)
        .await;

    (
        StatusCode::CREATED,
        Json(FeedbackAcceptedResponse {
            success: true,
            message: "Thank you for your feedback!".to_string(),
        }),
    )
}

/// GET /api/feedback - List feedback (admin only).
pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
) -> Json<FeedbackListResponse> {
    let feedback = state.journal.list_feedback().await;

    Json(FeedbackListResponse {
        total: feedback.len(),
        feedback: feedback.into_iter().map(Into::into).collect(),
    })
}
