pub mod auth;
pub mod members;
pub mod notes;
pub mod tenants;

use axum::Router;
use axum::routing::{get, patch, post, put};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        // Notes
        .route("/api/v1/notes", get(notes::list).post(notes::create))
        .route("/api/v1/notes/tenant/all", get(notes::list_tenant_all))
        .route(
            "/api/v1/notes/tenant/statistics",
            get(notes::tenant_statistics),
        )
        .route("/api/v1/notes/tag/{tag}", get(notes::find_by_tag))
        .route("/api/v1/notes/user/{user_id}", get(notes::list_by_user))
        .route(
            "/api/v1/notes/{id}",
            get(notes::get).patch(notes::update).delete(notes::delete),
        )
        .route("/api/v1/notes/{id}/archive", patch(notes::archive))
        .route("/api/v1/notes/{id}/unarchive", patch(notes::unarchive))
        // Tenants
        .route(
            "/api/v1/tenants",
            get(tenants::list).post(tenants::create),
        )
        .route("/api/v1/tenants/slug/{slug}", get(tenants::get_by_slug))
        .route(
            "/api/v1/tenants/{id}",
            get(tenants::get)
                .patch(tenants::update)
                .delete(tenants::delete),
        )
        .route(
            "/api/v1/tenants/{id}/settings",
            patch(tenants::update_settings),
        )
        .route("/api/v1/tenants/{id}/activate", patch(tenants::activate))
        .route(
            "/api/v1/tenants/{id}/deactivate",
            patch(tenants::deactivate),
        )
        .route(
            "/api/v1/tenants/{id}/users/count",
            get(tenants::user_count),
        )
        .route(
            "/api/v1/tenant/audit-events",
            get(tenants::audit_events),
        )
        // Tenant members
        .route(
            "/api/v1/tenant/members",
            get(members::list).post(members::add),
        )
        .route(
            "/api/v1/tenant/members/{id}",
            put(members::update_role).delete(members::remove),
        )
}
