//! Journal post handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::journal::PostFilter;
use crate::web::dto::{
    PostEnvelope, PostListResponse, PostQuery, PostRequest, SuccessResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AdminSession, MaybeAdmin};

use super::AppState;

/// GET /api/posts - List posts.
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    admin: MaybeAdmin,
    Query(query): Query<PostQuery>,
) -> Json<PostListResponse> {
    let filter = PostFilter {
        search: query.search,
        tag: query.tag,
    };
    let posts = state.journal.list_posts(&filter).await;

    Json(PostListResponse {
        posts: posts.into_iter().map(Into::into).collect(),
        is_authenticated: admin.is_admin(),
    })
}

/// POST /api/posts - Create a post (admin only).
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    ValidatedJson(req): ValidatedJson<PostRequest>,
) -> (StatusCode, Json<PostEnvelope>) {
    let post = state.journal.create_post(req.content.trim()).await;

    (
        StatusCode::CREATED,
        Json(PostEnvelope { post: post.into() }),
    )
}

/// PUT /api/posts/:id - Update a post (admin only).
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<PostRequest>,
) -> Result<Json<PostEnvelope>, ApiError> {
    let post = state.journal.update_post(id, req.content.trim()).await?;
    Ok(Json(PostEnvelope { post: post.into() }))
}

/// DELETE /api/posts/:id - Delete a post (admin only).
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.journal.delete_post(id).await?;
    Ok(Json(SuccessResponse::ok()))
}
