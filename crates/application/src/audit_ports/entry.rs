use chrono::{DateTime, Utc};
use custodia_core::{BranchId, TenantId, UserId};
use serde_json::Value;
use uuid::Uuid;

/// Stored audit row as read back from the log.
///
/// `changes` and `metadata` carry the raw stored text. They are decoded and
/// masked by the query service, never handed out as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogEntry {
    /// Stable entry identifier.
    pub id: Uuid,
    /// Business module that produced the entry.
    pub module: String,
    /// Entity type inside the module.
    pub entity: String,
    /// Affected entity identifier, when there is one.
    pub entity_id: Option<String>,
    /// Stable action identifier.
    pub action: String,
    /// Acting user.
    pub user_id: UserId,
    /// Client address captured by the producer.
    pub ip_address: Option<String>,
    /// Client user agent captured by the producer.
    pub user_agent: Option<String>,
    /// Raw stored change payload.
    pub changes: String,
    /// Raw stored metadata payload.
    pub metadata: String,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning branch, when the entry is branch-bound.
    pub branch_id: Option<BranchId>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

/// Entry handed to the append-only producer port.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogEntryDraft {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning branch.
    pub branch_id: Option<BranchId>,
    /// Acting user.
    pub user_id: UserId,
    /// Business module.
    pub module: String,
    /// Entity type.
    pub entity: String,
    /// Affected entity identifier.
    pub entity_id: Option<String>,
    /// Stable action identifier.
    pub action: String,
    /// Client address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Change payload, stored unmasked.
    pub changes: Value,
    /// Free-form metadata, stored unmasked.
    pub metadata: Value,
}
