pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::drafts::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Draft collection
        .route(
            "/api/v1/drafts",
            get(handlers::handle_list_drafts).post(handlers::handle_create_draft),
        )
        .route("/api/v1/drafts/diff", get(handlers::handle_diff))
        .route("/api/v1/drafts/merge", post(handlers::handle_merge))
        .route("/api/v1/drafts/restore", post(handlers::handle_restore))
        .route(
            "/api/v1/drafts/:id",
            get(handlers::handle_get_draft)
                .patch(handlers::handle_rename_draft)
                .delete(handlers::handle_delete_draft),
        )
        .route(
            "/api/v1/drafts/:id/content",
            put(handlers::handle_replace_content),
        )
        // Active draft
        .route("/api/v1/drafts/active", put(handlers::handle_set_active))
        .route(
            "/api/v1/drafts/active/duplicate",
            post(handlers::handle_duplicate_active),
        )
        .route(
            "/api/v1/drafts/active/skills",
            post(handlers::handle_apply_skills),
        )
        .route(
            "/api/v1/drafts/active/experience",
            post(handlers::handle_apply_experience),
        )
        .route(
            "/api/v1/drafts/active/summary",
            post(handlers::handle_apply_summary),
        )
        .route(
            "/api/v1/drafts/active/generated",
            post(handlers::handle_apply_generated),
        )
        .route("/api/v1/drafts/active/job", put(handlers::handle_set_job))
        .with_state(state)
}
