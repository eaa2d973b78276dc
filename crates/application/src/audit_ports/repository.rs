use async_trait::async_trait;
use custodia_core::AppResult;
use uuid::Uuid;

use super::{
    AuditFilterColumn, AuditLogEntry, AuditLogEntryDraft, AuditLogFilter, AuditLogPage, AuditScope,
};

/// Read-only port over the audit log.
///
/// Every method takes the caller's scope and applies it in the same
/// predicate as the other filters.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Finds one entry by id inside the scope.
    async fn find_by_id(&self, scope: AuditScope, id: Uuid) -> AppResult<Option<AuditLogEntry>>;

    /// Lists one page of entries newest first.
    async fn find_many(&self, scope: AuditScope, filter: AuditLogFilter)
    -> AppResult<AuditLogPage>;

    /// Returns the sorted distinct values of a column inside the scope.
    async fn distinct_values(
        &self,
        scope: AuditScope,
        column: AuditFilterColumn,
    ) -> AppResult<Vec<String>>;
}

/// Append-only producer port used by business modules.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one entry.
    async fn append(&self, draft: AuditLogEntryDraft) -> AppResult<()>;
}
