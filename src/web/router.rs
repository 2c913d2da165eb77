//! Router configuration for the web API.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use super::handlers::{
    captcha, create_post, delete_post, list_feedback, list_posts, login, logout, submit_feedback,
    update_post, verify, AppState,
};
use super::middleware::{api_rate_limit, create_cors_layer, security_headers, session_auth};

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/verify", get(verify));

    let limiter = app_state.limiter.clone();
    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/captcha", get(captcha))
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id", put(update_post).delete(delete_post))
        .route("/feedback", get(list_feedback).post(submit_feedback))
        .layer(middleware::from_fn(move |req, next| {
            api_rate_limit(limiter.clone(), req, next)
        }));

    let authenticator = app_state.authenticator.clone();

    Router::new()
        .nest("/api", api_routes)
        .merge(create_health_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    session_auth(authenticator.clone(), req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
