//! Axum route handlers for the Drafts API.
//!
//! The core reports unmet preconditions as `None`/`false`; this layer turns
//! them into 404/409 responses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::drafts::diff::{diff, DraftDiff};
use crate::drafts::experience::append_experience_from_ai;
use crate::drafts::lifecycle::{
    apply_generated_content, apply_summary, duplicate_active, merge_draft_sections,
    set_last_applied_job, MergeOptions,
};
use crate::drafts::skills::apply_ordered_skills;
use crate::drafts::store::{DraftStore, NewDraft};
use crate::errors::AppError;
use crate::models::draft::{DraftContent, DraftRecord, ExperienceEntry, GeneratedContent};
use crate::state::AppState;

const DEFAULT_DRAFT_NAME: &str = "Untitled draft";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftListResponse {
    pub drafts: Vec<DraftRecord>,
    pub active_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftRequest {
    #[serde(default)]
    pub name: String,
    pub template_id: Option<String>,
    pub owner: Option<String>,
    #[serde(default)]
    pub content: DraftContent,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DuplicateRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DuplicateResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct SkillsRequest {
    pub skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExperienceRequest {
    pub entries: Vec<ExperienceEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub summary: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRequest {
    pub content: GeneratedContent,
    pub job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DiffQuery {
    pub a: String,
    pub b: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub options: MergeOptions,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn draft_or_404(store: &DraftStore, id: &str) -> Result<DraftRecord, AppError> {
    store
        .get(id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Draft {id} not found")))
}

fn active_or_404(store: &DraftStore) -> Result<DraftRecord, AppError> {
    store
        .active()
        .cloned()
        .ok_or_else(|| AppError::NotFound("No active draft".to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/drafts
pub async fn handle_list_drafts(
    State(state): State<AppState>,
) -> Result<Json<DraftListResponse>, AppError> {
    let response = state
        .with_store(|store| {
            Ok(DraftListResponse {
                drafts: store.records().to_vec(),
                active_id: store.active_id().map(str::to_string),
            })
        })
        .await?;
    Ok(Json(response))
}

/// POST /api/v1/drafts
pub async fn handle_create_draft(
    State(state): State<AppState>,
    Json(req): Json<CreateDraftRequest>,
) -> Result<(StatusCode, Json<DraftRecord>), AppError> {
    let name = match req.name.trim() {
        "" => DEFAULT_DRAFT_NAME.to_string(),
        name => name.to_string(),
    };
    let new = NewDraft {
        name,
        template_id: req.template_id,
        owner: req.owner,
        content: req.content,
    };
    let record = state.with_store(move |store| Ok(store.create_draft(new))).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/v1/drafts/:id
pub async fn handle_get_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftRecord>, AppError> {
    let record = state.with_store(move |store| draft_or_404(store, &id)).await?;
    Ok(Json(record))
}

/// PATCH /api/v1/drafts/:id
pub async fn handle_rename_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<DraftRecord>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Draft name must not be empty".to_string()));
    }
    let record = state
        .with_store(move |store| {
            if !store.rename(&id, &req.name) {
                return Err(AppError::NotFound(format!("Draft {id} not found")));
            }
            draft_or_404(store, &id)
        })
        .await?;
    Ok(Json(record))
}

/// PUT /api/v1/drafts/:id/content
pub async fn handle_replace_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(content): Json<DraftContent>,
) -> Result<Json<DraftRecord>, AppError> {
    let record = state
        .with_store(move |store| {
            if !store.replace_content(&id, content) {
                return Err(AppError::NotFound(format!("Draft {id} not found")));
            }
            draft_or_404(store, &id)
        })
        .await?;
    Ok(Json(record))
}

/// DELETE /api/v1/drafts/:id
/// Returns the removed record; the client holds it for undo.
pub async fn handle_delete_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftRecord>, AppError> {
    let removed = state
        .with_store(move |store| {
            store
                .delete_draft(&id)
                .ok_or_else(|| AppError::NotFound(format!("Draft {id} not found")))
        })
        .await?;
    Ok(Json(removed))
}

/// POST /api/v1/drafts/restore
pub async fn handle_restore(
    State(state): State<AppState>,
    Json(record): Json<DraftRecord>,
) -> Result<(StatusCode, Json<DraftRecord>), AppError> {
    let restored = state
        .with_store(move |store| {
            let id = record.id.clone();
            if !store.restore_draft(record) {
                return Err(AppError::Conflict(format!("Draft {id} already exists")));
            }
            draft_or_404(store, &id)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(restored)))
}

/// PUT /api/v1/drafts/active
pub async fn handle_set_active(
    State(state): State<AppState>,
    Json(req): Json<SetActiveRequest>,
) -> Result<StatusCode, AppError> {
    state
        .with_store(move |store| {
            if !store.set_active(req.id.as_deref()) {
                return Err(AppError::NotFound(format!(
                    "Draft {} not found",
                    req.id.unwrap_or_default()
                )));
            }
            Ok(())
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/drafts/active/duplicate
pub async fn handle_duplicate_active(
    State(state): State<AppState>,
    body: Option<Json<DuplicateRequest>>,
) -> Result<(StatusCode, Json<DuplicateResponse>), AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let id = state
        .with_store(move |store| {
            duplicate_active(store, req.name.as_deref())
                .ok_or_else(|| AppError::NotFound("No active draft".to_string()))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(DuplicateResponse { id })))
}

/// POST /api/v1/drafts/active/skills
pub async fn handle_apply_skills(
    State(state): State<AppState>,
    Json(req): Json<SkillsRequest>,
) -> Result<Json<DraftRecord>, AppError> {
    let record = state
        .with_store(move |store| {
            if !apply_ordered_skills(store, &req.skills) {
                return Err(AppError::NotFound("No active draft".to_string()));
            }
            active_or_404(store)
        })
        .await?;
    Ok(Json(record))
}

/// POST /api/v1/drafts/active/experience
pub async fn handle_apply_experience(
    State(state): State<AppState>,
    Json(req): Json<ExperienceRequest>,
) -> Result<Json<DraftRecord>, AppError> {
    let record = state
        .with_store(move |store| {
            if !append_experience_from_ai(store, &req.entries) {
                return Err(AppError::NotFound("No active draft".to_string()));
            }
            active_or_404(store)
        })
        .await?;
    Ok(Json(record))
}

/// POST /api/v1/drafts/active/summary
pub async fn handle_apply_summary(
    State(state): State<AppState>,
    Json(req): Json<SummaryRequest>,
) -> Result<Json<DraftRecord>, AppError> {
    let record = state
        .with_store(move |store| {
            if !apply_summary(store, &req.summary) {
                return Err(AppError::NotFound("No active draft".to_string()));
            }
            active_or_404(store)
        })
        .await?;
    Ok(Json(record))
}

/// POST /api/v1/drafts/active/generated
pub async fn handle_apply_generated(
    State(state): State<AppState>,
    Json(req): Json<GeneratedRequest>,
) -> Result<Json<DraftRecord>, AppError> {
    let record = state
        .with_store(move |store| {
            if !apply_generated_content(store, &req.content, req.job_id.as_deref()) {
                return Err(AppError::NotFound("No active draft".to_string()));
            }
            active_or_404(store)
        })
        .await?;
    Ok(Json(record))
}

/// PUT /api/v1/drafts/active/job
pub async fn handle_set_job(
    State(state): State<AppState>,
    Json(req): Json<JobRequest>,
) -> Result<StatusCode, AppError> {
    if req.job_id.trim().is_empty() {
        return Err(AppError::Validation("jobId must not be empty".to_string()));
    }
    state
        .with_store(move |store| {
            active_or_404(store)?;
            set_last_applied_job(store, &req.job_id);
            Ok(())
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/drafts/diff?a=&b=
pub async fn handle_diff(
    State(state): State<AppState>,
    Query(q): Query<DiffQuery>,
) -> Result<Json<DraftDiff>, AppError> {
    let report = state
        .with_store(move |store| {
            diff(store, &q.a, &q.b)
                .ok_or_else(|| AppError::NotFound(format!("Draft {} or {} not found", q.a, q.b)))
        })
        .await?;
    Ok(Json(report))
}

/// POST /api/v1/drafts/merge
pub async fn handle_merge(
    State(state): State<AppState>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<DraftRecord>, AppError> {
    let record = state
        .with_store(move |store| {
            if !merge_draft_sections(store, &req.source_id, &req.target_id, &req.options) {
                return Err(AppError::NotFound(format!(
                    "Draft {} or {} not found",
                    req.source_id, req.target_id
                )));
            }
            draft_or_404(store, &req.target_id)
        })
        .await?;
    Ok(Json(record))
}
