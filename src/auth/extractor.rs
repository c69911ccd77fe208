use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::auth::jwt;
use crate::db;
use crate::error::AppError;
use crate::models::{ROLE_ADMIN, ROLE_SUPER_ADMIN, Tenant};
use crate::state::SharedState;

/// The verified principal: identity claims taken from the bearer token and
/// nothing else. Tenant identity is never read from request input.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    /// Role gate for tenant-scoped admin operations. The tenant the admin
    /// acts on is always the one in their own token.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == ROLE_ADMIN || self.role == ROLE_SUPER_ADMIN {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }

    /// Role gate for cross-tenant operations (tenant provisioning).
    pub fn require_super_admin(&self) -> Result<(), AppError> {
        if self.role == ROLE_SUPER_ADMIN {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Super admin access required".to_string(),
            ))
        }
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .ok_or_else(|| AppError::Unauthorized("Missing authentication token".to_string()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Missing authentication token".to_string()))?;

        let claims = jwt::decode_token(token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(AuthUser {
            user_id: claims.sub,
            tenant_id: claims.tid,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Authenticated principal plus its resolved, active tenant. Extracting this
/// is the second stage of the access control pipeline: a valid token whose
/// tenant is missing or deactivated is rejected here, before any handler
/// logic or resource lookup runs.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub auth: AuthUser,
    pub tenant: Tenant,
}

impl FromRequestParts<SharedState> for TenantContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        let tenant = db::tenants::find_by_id(&state.pool, auth.tenant_id)
            .await?
            .ok_or_else(|| {
                AppError::Forbidden("User does not belong to any tenant".to_string())
            })?;

        if !tenant.is_active {
            return Err(AppError::Forbidden("Tenant is inactive".to_string()));
        }

        Ok(TenantContext { auth, tenant })
    }
}
