use sqlx::PgPool;

pub use crate::db::audit::NewEvent;

/// Append to the audit trail without letting a failed write fail the
/// mutation it records.
pub async fn log_event(pool: &PgPool, event: NewEvent<'_>) {
    if let Err(e) = crate::db::audit::insert(pool, &event).await {
        tracing::error!(action = event.action, "Failed to record audit event: {e}");
    }
}
