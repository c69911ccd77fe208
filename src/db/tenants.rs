use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Tenant;

pub struct NewTenant<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub domain: Option<&'a str>,
    pub settings: serde_json::Value,
    pub max_users: Option<i32>,
    pub max_storage: Option<i64>,
    pub plan: &'a str,
}

/// Partial update. Outer `None` keeps the stored value; for the nullable
/// columns an inner `None` writes NULL (unsetting a domain or lifting a
/// user/storage cap).
#[derive(Default)]
pub struct TenantPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub plan: Option<String>,
    pub domain: Option<Option<String>>,
    pub max_users: Option<Option<i32>>,
    pub max_storage: Option<Option<i64>>,
}

/// Probe name/slug/domain for collisions with other tenants, returning the
/// names of every colliding field. `exclude` skips a tenant's own row so
/// updates don't collide with themselves.
pub async fn find_conflicts(
    pool: &PgPool,
    name: Option<&str>,
    slug: Option<&str>,
    domain: Option<&str>,
    exclude: Option<Uuid>,
) -> Result<Vec<&'static str>, sqlx::Error> {
    let mut conflicts = Vec::new();

    if let Some(name) = name {
        if probe(pool, "name", name, exclude).await? {
            conflicts.push("name");
        }
    }
    if let Some(slug) = slug {
        if probe(pool, "slug", slug, exclude).await? {
            conflicts.push("slug");
        }
    }
    if let Some(domain) = domain {
        if probe(pool, "domain", domain, exclude).await? {
            conflicts.push("domain");
        }
    }

    Ok(conflicts)
}

async fn probe(
    pool: &PgPool,
    column: &str,
    value: &str,
    exclude: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    // `column` comes from a fixed set above, never from request input.
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM tenants WHERE {column} = $1 AND ($2::uuid IS NULL OR id <> $2))"
    );
    sqlx::query_scalar(&sql)
        .bind(value)
        .bind(exclude)
        .fetch_one(pool)
        .await
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    tenant: &NewTenant<'_>,
) -> Result<Tenant, sqlx::Error> {
    sqlx::query_as::<_, Tenant>(
        "INSERT INTO tenants (name, slug, domain, settings, max_users, max_storage, plan)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(tenant.name)
    .bind(tenant.slug)
    .bind(tenant.domain)
    .bind(&tenant.settings)
    .bind(tenant.max_users)
    .bind(tenant.max_storage)
    .bind(tenant.plan)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Slug resolution only ever considers active tenants.
pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE slug = $1 AND is_active = TRUE")
        .bind(slug)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_domain(pool: &PgPool, domain: &str) -> Result<Option<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE domain = $1 AND is_active = TRUE")
        .bind(domain)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>(
        "SELECT * FROM tenants WHERE ($1 OR is_active = TRUE) ORDER BY created_at DESC",
    )
    .bind(include_inactive)
    .fetch_all(pool)
    .await
}

pub async fn update(pool: &PgPool, id: Uuid, patch: &TenantPatch) -> Result<Tenant, sqlx::Error> {
    // COALESCE cannot express "write NULL", so the nullable columns get an
    // explicit changed-flag alongside the value.
    sqlx::query_as::<_, Tenant>(
        "UPDATE tenants SET
             name = COALESCE($2, name),
             slug = COALESCE($3, slug),
             plan = COALESCE($4, plan),
             domain = CASE WHEN $5 THEN $6 ELSE domain END,
             max_users = CASE WHEN $7 THEN $8 ELSE max_users END,
             max_storage = CASE WHEN $9 THEN $10 ELSE max_storage END,
             updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&patch.name)
    .bind(&patch.slug)
    .bind(&patch.plan)
    .bind(patch.domain.is_some())
    .bind(patch.domain.as_ref().and_then(|d| d.as_deref()))
    .bind(patch.max_users.is_some())
    .bind(patch.max_users.flatten())
    .bind(patch.max_storage.is_some())
    .bind(patch.max_storage.flatten())
    .fetch_one(pool)
    .await
}

/// Idempotent activation flip. Deactivating only gates tenant resolution and
/// login; it does not touch the tenant's users or notes.
pub async fn set_active(pool: &PgPool, id: Uuid, active: bool) -> Result<Tenant, sqlx::Error> {
    sqlx::query_as::<_, Tenant>(
        "UPDATE tenants SET is_active = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(active)
    .fetch_one(pool)
    .await
}

/// Shallow-merge the given map into the stored settings: provided keys
/// overwrite, absent keys are preserved.
pub async fn update_settings(
    pool: &PgPool,
    id: Uuid,
    settings: &serde_json::Value,
) -> Result<Tenant, sqlx::Error> {
    sqlx::query_as::<_, Tenant>(
        "UPDATE tenants SET settings = settings || $2, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(settings)
    .fetch_one(pool)
    .await
}

pub async fn user_count(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE tenant_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Capacity check against `max_users`. Unset means unlimited.
pub async fn can_add_user(pool: &PgPool, tenant: &Tenant) -> Result<bool, sqlx::Error> {
    match tenant.max_users {
        None => Ok(true),
        Some(max) => Ok(user_count(pool, tenant.id).await? < max as i64),
    }
}

/// Hard delete. Users and notes go with the tenant via FK cascade.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
