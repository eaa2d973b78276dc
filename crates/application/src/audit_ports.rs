mod entry;
mod query;
mod repository;

pub use entry::{AuditLogEntry, AuditLogEntryDraft};
pub use query::{AuditFilterColumn, AuditLogFilter, AuditLogPage, AuditScope};
pub use repository::{AuditLogRepository, AuditRepository};
