mod audit_event;
mod note;
mod tenant;
mod user;

pub use audit_event::AuditEvent;
pub use note::{Note, NoteStatistics, UserNoteCount};
pub use tenant::Tenant;
pub use user::{ROLE_ADMIN, ROLE_SUPER_ADMIN, ROLE_USER, User};
