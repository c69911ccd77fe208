use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::TenantContext;
use crate::db;
use crate::db::notes::NoteFilter;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{Note, NoteStatistics};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateNote {
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct UpdateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_archived: Option<bool>,
}

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub include_archived: bool,
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    if title.len() > 255 {
        return Err(AppError::BadRequest(
            "Title must be at most 255 characters".to_string(),
        ));
    }
    Ok(())
}

pub async fn create(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Json(req): Json<CreateNote>,
) -> Result<Json<Note>, AppError> {
    validate_title(&req.title)?;
    if req.content.is_empty() {
        return Err(AppError::BadRequest("Content is required".to_string()));
    }

    let tags = req.tags.unwrap_or_default();
    let note = db::notes::create(
        &state.pool,
        ctx.tenant.id,
        ctx.auth.user_id,
        &req.title,
        &req.content,
        &tags,
    )
    .await?;

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            action: "note.created",
            resource_type: "note",
            resource_id: Some(note.id),
            details: None,
        },
    )
    .await;

    Ok(Json(note))
}

/// The caller's own notes, most recently updated first.
pub async fn list(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Note>>, AppError> {
    let notes = db::notes::list(
        &state.pool,
        &NoteFilter {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            include_archived: params.include_archived,
        },
    )
    .await?;
    Ok(Json(notes))
}

/// Every note in the caller's tenant, across owners. Admin only.
pub async fn list_tenant_all(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Note>>, AppError> {
    ctx.auth.require_admin()?;

    let notes = db::notes::list(
        &state.pool,
        &NoteFilter {
            tenant_id: ctx.tenant.id,
            user_id: None,
            include_archived: params.include_archived,
        },
    )
    .await?;
    Ok(Json(notes))
}

pub async fn tenant_statistics(
    ctx: TenantContext,
    State(state): State<SharedState>,
) -> Result<Json<NoteStatistics>, AppError> {
    ctx.auth.require_admin()?;

    let stats = db::notes::statistics(&state.pool, ctx.tenant.id).await?;
    Ok(Json(stats))
}

pub async fn find_by_tag(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(tag): Path<String>,
) -> Result<Json<Vec<Note>>, AppError> {
    let notes = db::notes::find_by_tag(
        &state.pool,
        &tag,
        ctx.tenant.id,
        Some(ctx.auth.user_id),
    )
    .await?;
    Ok(Json(notes))
}

/// Another user's notes within the caller's tenant. Admin only.
pub async fn list_by_user(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Note>>, AppError> {
    ctx.auth.require_admin()?;

    let notes = db::notes::list(
        &state.pool,
        &NoteFilter {
            tenant_id: ctx.tenant.id,
            user_id: Some(user_id),
            include_archived: false,
        },
    )
    .await?;
    Ok(Json(notes))
}

pub async fn get(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Note>, AppError> {
    let note = db::notes::find_by_id(&state.pool, id, ctx.tenant.id, Some(ctx.auth.user_id))
        .await?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;
    Ok(Json(note))
}

pub async fn update(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNote>,
) -> Result<Json<Note>, AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }

    let note = apply_patch(&state, &ctx, id, req).await?;

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            action: "note.updated",
            resource_type: "note",
            resource_id: Some(note.id),
            details: None,
        },
    )
    .await;

    Ok(Json(note))
}

/// Load the note through the scoped lookup, then write the patched record.
/// The explicit owner re-check after the load is deliberate defense in depth
/// on top of the query-level scoping; it answers NotFound so existence never
/// leaks across owners.
async fn apply_patch(
    state: &SharedState,
    ctx: &TenantContext,
    id: Uuid,
    patch: UpdateNote,
) -> Result<Note, AppError> {
    let note = db::notes::find_by_id(&state.pool, id, ctx.tenant.id, Some(ctx.auth.user_id))
        .await?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

    if note.user_id != ctx.auth.user_id {
        return Err(AppError::NotFound("Note not found".to_string()));
    }

    let title = patch.title.unwrap_or(note.title);
    let content = patch.content.unwrap_or(note.content);
    let tags = patch.tags.unwrap_or(note.tags);
    let is_archived = patch.is_archived.unwrap_or(note.is_archived);

    let updated = db::notes::update(&state.pool, note.id, &title, &content, &tags, is_archived)
        .await?;
    Ok(updated)
}

pub async fn archive(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Note>, AppError> {
    set_archived(ctx, state, id, true).await
}

pub async fn unarchive(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Note>, AppError> {
    set_archived(ctx, state, id, false).await
}

async fn set_archived(
    ctx: TenantContext,
    state: SharedState,
    id: Uuid,
    archived: bool,
) -> Result<Json<Note>, AppError> {
    let note = apply_patch(
        &state,
        &ctx,
        id,
        UpdateNote {
            title: None,
            content: None,
            tags: None,
            is_archived: Some(archived),
        },
    )
    .await?;

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            action: if archived { "note.archived" } else { "note.unarchived" },
            resource_type: "note",
            resource_id: Some(note.id),
            details: None,
        },
    )
    .await;

    Ok(Json(note))
}

pub async fn delete(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let note = db::notes::find_by_id(&state.pool, id, ctx.tenant.id, Some(ctx.auth.user_id))
        .await?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

    // Same deliberate re-check as update.
    if note.user_id != ctx.auth.user_id {
        return Err(AppError::NotFound("Note not found".to_string()));
    }

    let deleted = db::notes::delete(&state.pool, note.id, ctx.tenant.id, ctx.auth.user_id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Note not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            action: "note.deleted",
            resource_type: "note",
            resource_id: Some(id),
            details: None,
        },
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
