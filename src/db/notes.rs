use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::models::{Note, NoteStatistics, UserNoteCount};

/// Scoping predicate for note queries. Tenant is mandatory and always applied
/// first; owner narrows further when present; archived rows are excluded
/// unless asked for.
#[derive(Debug, Clone, Copy)]
pub struct NoteFilter {
    pub tenant_id: Uuid,
    pub user_id: Option<Uuid>,
    pub include_archived: bool,
}

pub async fn create(
    pool: &PgPool,
    tenant_id: Uuid,
    user_id: Uuid,
    title: &str,
    content: &str,
    tags: &[String],
) -> Result<Note, sqlx::Error> {
    sqlx::query_as::<_, Note>(
        "INSERT INTO notes (tenant_id, user_id, title, content, tags)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(tenant_id)
    .bind(user_id)
    .bind(title)
    .bind(content)
    .bind(tags)
    .fetch_one(pool)
    .await
}

pub async fn list(pool: &PgPool, filter: &NoteFilter) -> Result<Vec<Note>, sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT * FROM notes WHERE tenant_id = ");
    qb.push_bind(filter.tenant_id);
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ");
        qb.push_bind(user_id);
    }
    if !filter.include_archived {
        qb.push(" AND is_archived = FALSE");
    }
    // Id breaks updated_at ties so the ordering stays deterministic.
    qb.push(" ORDER BY updated_at DESC, id DESC");

    qb.build_query_as::<Note>().fetch_all(pool).await
}

/// Scoped lookup. A note that exists but fails the tenant or owner predicate
/// is indistinguishable from one that does not exist.
pub async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
    tenant_id: Uuid,
    user_id: Option<Uuid>,
) -> Result<Option<Note>, sqlx::Error> {
    sqlx::query_as::<_, Note>(
        "SELECT * FROM notes
         WHERE id = $1 AND tenant_id = $2 AND ($3::uuid IS NULL OR user_id = $3)",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    title: &str,
    content: &str,
    tags: &[String],
    is_archived: bool,
) -> Result<Note, sqlx::Error> {
    sqlx::query_as::<_, Note>(
        "UPDATE notes SET title = $2, content = $3, tags = $4, is_archived = $5,
             updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(title)
    .bind(content)
    .bind(tags)
    .bind(is_archived)
    .fetch_one(pool)
    .await
}

pub async fn delete(
    pool: &PgPool,
    id: Uuid,
    tenant_id: Uuid,
    user_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND tenant_id = $2 AND user_id = $3")
        .bind(id)
        .bind(tenant_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Exact, case-sensitive tag membership. Tag search never surfaces archived
/// notes, regardless of what a plain list would return.
pub async fn find_by_tag(
    pool: &PgPool,
    tag: &str,
    tenant_id: Uuid,
    user_id: Option<Uuid>,
) -> Result<Vec<Note>, sqlx::Error> {
    sqlx::query_as::<_, Note>(
        "SELECT * FROM notes
         WHERE $1 = ANY(tags) AND tenant_id = $2
           AND ($3::uuid IS NULL OR user_id = $3)
           AND is_archived = FALSE
         ORDER BY updated_at DESC, id DESC",
    )
    .bind(tag)
    .bind(tenant_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn statistics(pool: &PgPool, tenant_id: Uuid) -> Result<NoteStatistics, sqlx::Error> {
    let (total_notes, active_notes, archived_notes): (i64, i64, i64) = sqlx::query_as(
        "SELECT COUNT(*),
                COUNT(*) FILTER (WHERE NOT is_archived),
                COUNT(*) FILTER (WHERE is_archived)
         FROM notes WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_one(pool)
    .await?;

    // Grouped over existing notes only; users without notes do not appear.
    let notes_by_user = sqlx::query_as::<_, UserNoteCount>(
        "SELECT n.user_id,
                u.first_name || ' ' || u.last_name AS user_name,
                COUNT(*) AS note_count
         FROM notes n
         JOIN users u ON u.id = n.user_id
         WHERE n.tenant_id = $1
         GROUP BY n.user_id, u.first_name, u.last_name
         ORDER BY note_count DESC, n.user_id",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(NoteStatistics {
        total_notes,
        active_notes,
        archived_notes,
        notes_by_user,
    })
}
