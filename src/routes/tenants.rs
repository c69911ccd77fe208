use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::TenantContext;
use crate::db;
use crate::db::tenants::{NewTenant, TenantPatch};
use crate::error::{AppError, map_unique_violation};
use crate::middleware::audit;
use crate::models::{AuditEvent, Tenant};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
    pub settings: Option<serde_json::Value>,
    pub max_users: Option<i32>,
    pub max_storage: Option<i64>,
    pub plan: Option<String>,
}

/// Distinguishes an absent field (keep) from an explicit JSON null (unset).
fn patch_field<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub plan: Option<String>,
    #[serde(default, deserialize_with = "patch_field")]
    pub domain: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub max_users: Option<Option<i32>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub max_storage: Option<Option<i64>>,
}

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Deserialize)]
pub struct AuditParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.is_empty() || slug.len() > 100 {
        return Err(AppError::BadRequest(
            "Slug must be between 1 and 100 characters".to_string(),
        ));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AppError::BadRequest(
            "Slug must contain only lowercase letters, numbers, and hyphens".to_string(),
        ));
    }
    Ok(())
}

fn conflict_error(fields: &[&str]) -> AppError {
    AppError::Conflict(format!(
        "Tenant with this {} already exists",
        fields.join(", ")
    ))
}

pub async fn create(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Json(req): Json<CreateTenant>,
) -> Result<Json<Tenant>, AppError> {
    ctx.auth.require_super_admin()?;

    if req.name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    let slug = req.slug.to_lowercase();
    validate_slug(&slug)?;

    // All three uniqueness probes run and every colliding field is reported
    // together, not just the first.
    let conflicts = db::tenants::find_conflicts(
        &state.pool,
        Some(&req.name),
        Some(&slug),
        req.domain.as_deref(),
        None,
    )
    .await?;
    if !conflicts.is_empty() {
        return Err(conflict_error(&conflicts));
    }

    let tenant = db::tenants::create(
        &state.pool,
        &NewTenant {
            name: &req.name,
            slug: &slug,
            domain: req.domain.as_deref(),
            settings: req.settings.unwrap_or_else(|| serde_json::json!({})),
            max_users: req.max_users,
            max_storage: req.max_storage,
            plan: req.plan.as_deref().unwrap_or("free"),
        },
    )
    .await
    .map_err(|e| map_unique_violation(e, "Tenant with this name, slug or domain already exists"))?;

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            action: "tenant.created",
            resource_type: "tenant",
            resource_id: Some(tenant.id),
            details: None,
        },
    )
    .await;

    Ok(Json(tenant))
}

pub async fn list(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Tenant>>, AppError> {
    ctx.auth.require_super_admin()?;
    let tenants = db::tenants::list(&state.pool, params.include_inactive).await?;
    Ok(Json(tenants))
}

pub async fn get_by_slug(
    _ctx: TenantContext,
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<Json<Tenant>, AppError> {
    let tenant = db::tenants::find_by_slug(&state.pool, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;
    Ok(Json(tenant))
}

pub async fn get(
    _ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, AppError> {
    let tenant = db::tenants::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;
    Ok(Json(tenant))
}

pub async fn update(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTenant>,
) -> Result<Json<Tenant>, AppError> {
    ctx.auth.require_super_admin()?;

    let current = db::tenants::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    let slug = req.slug.map(|s| s.to_lowercase());
    if let Some(ref slug) = slug {
        validate_slug(slug)?;
    }

    // Only probe the fields that actually change, excluding this tenant's
    // own row from the collision search. Unsetting a domain cannot collide.
    let name_changed = req.name.as_deref().filter(|n| *n != current.name);
    let slug_changed = slug.as_deref().filter(|s| *s != current.slug);
    let domain_changed = req
        .domain
        .as_ref()
        .and_then(|d| d.as_deref())
        .filter(|d| current.domain.as_deref() != Some(d));

    let conflicts = db::tenants::find_conflicts(
        &state.pool,
        name_changed,
        slug_changed,
        domain_changed,
        Some(id),
    )
    .await?;
    if !conflicts.is_empty() {
        return Err(conflict_error(&conflicts));
    }

    let tenant = db::tenants::update(
        &state.pool,
        id,
        &TenantPatch {
            name: req.name,
            slug,
            domain: req.domain,
            plan: req.plan,
            max_users: req.max_users,
            max_storage: req.max_storage,
        },
    )
    .await
    .map_err(|e| map_unique_violation(e, "Tenant with this name, slug or domain already exists"))?;

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            action: "tenant.updated",
            resource_type: "tenant",
            resource_id: Some(tenant.id),
            details: None,
        },
    )
    .await;

    Ok(Json(tenant))
}

pub async fn update_settings(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(settings): Json<serde_json::Value>,
) -> Result<Json<Tenant>, AppError> {
    if !settings.is_object() {
        return Err(AppError::BadRequest(
            "Settings must be a JSON object".to_string(),
        ));
    }

    // Tenant admins may only manage their own tenant's settings.
    if ctx.auth.role != crate::models::ROLE_SUPER_ADMIN {
        ctx.auth.require_admin()?;
        if id != ctx.tenant.id {
            return Err(AppError::Forbidden(
                "You can only manage your own tenant".to_string(),
            ));
        }
    }

    db::tenants::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    let tenant = db::tenants::update_settings(&state.pool, id, &settings).await?;

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            action: "tenant.settings_updated",
            resource_type: "tenant",
            resource_id: Some(tenant.id),
            details: None,
        },
    )
    .await;

    Ok(Json(tenant))
}

pub async fn activate(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, AppError> {
    set_active(ctx, state, id, true).await
}

pub async fn deactivate(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, AppError> {
    set_active(ctx, state, id, false).await
}

async fn set_active(
    ctx: TenantContext,
    state: SharedState,
    id: Uuid,
    active: bool,
) -> Result<Json<Tenant>, AppError> {
    ctx.auth.require_super_admin()?;

    let tenant = db::tenants::set_active(&state.pool, id, active)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Tenant not found".to_string()),
            _ => AppError::Database(e),
        })?;

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            action: if active { "tenant.activated" } else { "tenant.deactivated" },
            resource_type: "tenant",
            resource_id: Some(tenant.id),
            details: None,
        },
    )
    .await;

    Ok(Json(tenant))
}

pub async fn user_count(
    _ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    db::tenants::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    let count = db::tenants::user_count(&state.pool, id).await?;
    Ok(Json(serde_json::json!({ "count": count })))
}

/// Audit trail for the caller's own tenant, newest first.
pub async fn audit_events(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Query(params): Query<AuditParams>,
) -> Result<Json<Vec<AuditEvent>>, AppError> {
    ctx.auth.require_admin()?;

    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0).max(0);

    let events = db::audit::list(&state.pool, ctx.tenant.id, limit, offset).await?;
    Ok(Json(events))
}

pub async fn delete(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    ctx.auth.require_super_admin()?;

    let deleted = db::tenants::delete(&state.pool, id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Tenant not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            action: "tenant.deleted",
            resource_type: "tenant",
            resource_id: Some(id),
            details: None,
        },
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
