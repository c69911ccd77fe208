use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::TenantContext;
use crate::auth::password;
use crate::db;
use crate::error::{AppError, map_unique_violation};
use crate::middleware::audit;
use crate::models::{ROLE_ADMIN, ROLE_SUPER_ADMIN, ROLE_USER, User};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct AddMember {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateMemberRole {
    pub role: String,
}

/// Only a super admin may grant the super_admin role.
fn validate_role(role: &str, caller: &crate::auth::extractor::AuthUser) -> Result<(), AppError> {
    match role {
        ROLE_USER | ROLE_ADMIN => Ok(()),
        ROLE_SUPER_ADMIN => caller.require_super_admin(),
        _ => Err(AppError::BadRequest(format!("Unknown role: {role}"))),
    }
}

pub async fn list(
    ctx: TenantContext,
    State(state): State<SharedState>,
) -> Result<Json<Vec<User>>, AppError> {
    ctx.auth.require_admin()?;
    let members = db::users::list_by_tenant(&state.pool, ctx.tenant.id).await?;
    Ok(Json(members))
}

pub async fn add(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Json(req): Json<AddMember>,
) -> Result<Json<User>, AppError> {
    ctx.auth.require_admin()?;

    if req.email.is_empty() || req.first_name.is_empty() || req.last_name.is_empty() {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let role = req.role.as_deref().unwrap_or(ROLE_USER);
    validate_role(role, &ctx.auth)?;

    if !db::tenants::can_add_user(&state.pool, &ctx.tenant).await? {
        return Err(AppError::Forbidden(
            "Tenant has reached its user limit".to_string(),
        ));
    }

    // Email conflict checked before hashing; the unique constraint covers
    // the race.
    if db::users::find_by_email(&state.pool, &req.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "A user with this email already exists".to_string(),
        ));
    }

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = db::users::create(
        &state.pool,
        ctx.tenant.id,
        &req.email,
        &pw_hash,
        &req.first_name,
        &req.last_name,
        role,
    )
    .await
    .map_err(|e| map_unique_violation(e, "A user with this email already exists"))?;

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            action: "member.added",
            resource_type: "user",
            resource_id: Some(user.id),
            details: None,
        },
    )
    .await;

    Ok(Json(user))
}

pub async fn update_role(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMemberRole>,
) -> Result<Json<serde_json::Value>, AppError> {
    ctx.auth.require_admin()?;
    validate_role(&req.role, &ctx.auth)?;

    // A member outside the caller's tenant is indistinguishable from a
    // missing one.
    let user = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if user.tenant_id != ctx.tenant.id {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    db::users::update_role(&state.pool, id, &req.role).await?;

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            action: "member.role_updated",
            resource_type: "user",
            resource_id: Some(id),
            details: Some(serde_json::json!({ "new_role": req.role })),
        },
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Role updated" })))
}

pub async fn remove(
    ctx: TenantContext,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    ctx.auth.require_admin()?;

    if id == ctx.auth.user_id {
        return Err(AppError::BadRequest(
            "You cannot remove yourself".to_string(),
        ));
    }

    let user = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if user.tenant_id != ctx.tenant.id {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    db::users::delete(&state.pool, id).await?;

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: ctx.tenant.id,
            user_id: Some(ctx.auth.user_id),
            action: "member.removed",
            resource_type: "user",
            resource_id: Some(id),
            details: None,
        },
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Removed" })))
}
