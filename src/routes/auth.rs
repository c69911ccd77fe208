use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::{Claims, encode_token};
use crate::auth::password;
use crate::db;
use crate::error::{AppError, map_unique_violation};
use crate::middleware::audit;
use crate::models::{ROLE_ADMIN, ROLE_SUPER_ADMIN, ROLE_USER, Tenant, User};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub tenant_id: Option<Uuid>,
    pub tenant_slug: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.email.is_empty()
        || req.password.is_empty()
        || req.first_name.is_empty()
        || req.last_name.is_empty()
    {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }

    if !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }

    if req.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    // Checked before hashing so a duplicate costs no argon2 work. The unique
    // constraint on users.email still backs this up under races.
    if db::users::find_by_email(&state.pool, &req.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "A user with this email already exists".to_string(),
        ));
    }

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = match resolve_registration_tenant(&state, &req).await? {
        Some(tenant) => {
            if !db::tenants::can_add_user(&state.pool, &tenant).await? {
                return Err(AppError::Forbidden(
                    "Tenant has reached its user limit".to_string(),
                ));
            }

            let role = first_member_role(&state, &tenant).await?;
            db::users::create(
                &state.pool,
                tenant.id,
                &req.email,
                &pw_hash,
                &req.first_name,
                &req.last_name,
                role,
            )
            .await
            .map_err(|e| map_unique_violation(e, "A user with this email already exists"))?
        }
        None => bootstrap_registration(&state, &req, &pw_hash).await?,
    };

    let claims = Claims::new(user.id, user.tenant_id, user.email.clone(), user.role.clone());
    let access_token = encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: user.tenant_id,
            user_id: Some(user.id),
            action: "user.registered",
            resource_type: "user",
            resource_id: Some(user.id),
            details: None,
        },
    )
    .await;

    Ok(Json(AuthResponse { access_token, user }))
}

/// Pick the tenant a registration lands in. An explicit tenant reference
/// (id or slug) wins, then a tenant whose registered domain matches the
/// email's domain; the first user to join a tenant becomes its admin.
/// Returns None when nothing matched and the bootstrap path applies.
async fn resolve_registration_tenant(
    state: &SharedState,
    req: &RegisterRequest,
) -> Result<Option<Tenant>, AppError> {
    if let Some(tenant_id) = req.tenant_id {
        let tenant = db::tenants::find_by_id(&state.pool, tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;
        if !tenant.is_active {
            return Err(AppError::Forbidden("Tenant is inactive".to_string()));
        }
        return Ok(Some(tenant));
    }

    if let Some(ref slug) = req.tenant_slug {
        let tenant = db::tenants::find_by_slug(&state.pool, slug)
            .await?
            .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;
        return Ok(Some(tenant));
    }

    if let Some((_, email_domain)) = req.email.split_once('@')
        && let Some(tenant) = db::tenants::find_by_domain(&state.pool, email_domain).await?
    {
        return Ok(Some(tenant));
    }

    Ok(None)
}

/// The very first registration in an empty system creates its own workspace
/// tenant and becomes the super admin. Tenant and user rows are written in
/// one transaction under an advisory lock, so a concurrent bootstrap either
/// waits and then sees the committed user (and is turned away) or commits
/// both rows itself; a failed user insert rolls the tenant back with it.
async fn bootstrap_registration(
    state: &SharedState,
    req: &RegisterRequest,
    pw_hash: &str,
) -> Result<User, AppError> {
    let mut tx = state.pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(1)")
        .execute(&mut *tx)
        .await?;

    let count = db::users::count_all(&mut *tx).await?;
    if count > 0 {
        return Err(AppError::BadRequest(
            "tenant_id or tenant_slug is required".to_string(),
        ));
    }

    let name = format!("{}'s Workspace", req.first_name);
    let tenant = db::tenants::create(
        &mut *tx,
        &db::tenants::NewTenant {
            name: &name,
            slug: &slugify(&name),
            domain: None,
            settings: serde_json::json!({}),
            max_users: None,
            max_storage: None,
            plan: "free",
        },
    )
    .await
    .map_err(|e| AppError::Internal(format!("Failed to create tenant: {e}")))?;

    let user = db::users::create(
        &mut *tx,
        tenant.id,
        &req.email,
        pw_hash,
        &req.first_name,
        &req.last_name,
        ROLE_SUPER_ADMIN,
    )
    .await
    .map_err(|e| map_unique_violation(e, "A user with this email already exists"))?;

    tx.commit().await?;

    Ok(user)
}

async fn first_member_role(
    state: &SharedState,
    tenant: &Tenant,
) -> Result<&'static str, AppError> {
    let count = db::tenants::user_count(&state.pool, tenant.id).await?;
    Ok(if count == 0 { ROLE_ADMIN } else { ROLE_USER })
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if state.login_limiter.check(&req.email).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let user = db::users::find_by_email(&state.pool, &req.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if !password::verify(&req.password, &user.password_hash) {
        state.login_limiter.record_failure(&req.email);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    if !user.is_active {
        return Err(AppError::Forbidden("Account is disabled".to_string()));
    }

    // Deactivating a tenant gates login even with correct credentials.
    let tenant = db::tenants::find_by_id(&state.pool, user.tenant_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("User does not belong to any tenant".to_string()))?;

    if !tenant.is_active {
        return Err(AppError::Forbidden("Tenant is inactive".to_string()));
    }

    db::users::touch_last_login(&state.pool, user.id).await?;

    let claims = Claims::new(user.id, user.tenant_id, user.email.clone(), user.role.clone());
    let access_token = encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;

    audit::log_event(
        &state.pool,
        audit::NewEvent {
            tenant_id: user.tenant_id,
            user_id: Some(user.id),
            action: "user.login",
            resource_type: "user",
            resource_id: Some(user.id),
            details: None,
        },
    )
    .await;

    Ok(Json(AuthResponse { access_token, user }))
}

pub fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Acme Corp."), "acme-corp");
        assert_eq!(slugify("Jo's Workspace"), "jo-s-workspace");
        assert_eq!(slugify("--weird--input--"), "weird-input");
    }
}
