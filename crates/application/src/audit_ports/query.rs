use chrono::{DateTime, Utc};
use custodia_core::{BranchId, TenantId, UserId};

use super::AuditLogEntry;

/// Data partition a read is confined to.
///
/// Always derived from the caller's authorization context, never from
/// request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditScope {
    /// Tenant every returned row must belong to.
    pub tenant_id: TenantId,
    /// Branch every returned row must belong to, when set.
    pub branch_id: Option<BranchId>,
}

impl AuditScope {
    /// Returns whether a stored row falls inside this scope.
    #[must_use]
    pub fn contains(&self, entry: &AuditLogEntry) -> bool {
        entry.tenant_id == self.tenant_id
            && self
                .branch_id
                .is_none_or(|branch_id| entry.branch_id == Some(branch_id))
    }
}

/// Validated list filter in storage terms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuditLogFilter {
    /// Exact module match.
    pub module: Option<String>,
    /// Exact entity match.
    pub entity: Option<String>,
    /// Exact action match.
    pub action: Option<String>,
    /// Exact acting user match.
    pub user_id: Option<UserId>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
    /// Maximum rows returned.
    pub limit: u32,
    /// Rows skipped.
    pub offset: u64,
}

impl AuditLogFilter {
    /// Returns whether a stored row satisfies the equality and date predicates.
    #[must_use]
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.module.as_ref().is_none_or(|value| &entry.module == value)
            && self.entity.as_ref().is_none_or(|value| &entry.entity == value)
            && self.action.as_ref().is_none_or(|value| &entry.action == value)
            && self.user_id.is_none_or(|value| entry.user_id == value)
            && self.created_from.is_none_or(|value| entry.created_at >= value)
            && self.created_before.is_none_or(|value| entry.created_at < value)
    }
}

/// One page of rows plus the unpaged match count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuditLogPage {
    /// Rows ordered by `created_at DESC, id DESC`.
    pub rows: Vec<AuditLogEntry>,
    /// Number of rows matching the filter across all pages.
    pub total: u64,
}

/// Column offered as a filter option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditFilterColumn {
    /// `module`.
    Module,
    /// `entity`.
    Entity,
    /// `action`.
    Action,
}

impl AuditFilterColumn {
    /// Returns the storage column name.
    #[must_use]
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Entity => "entity",
            Self::Action => "action",
        }
    }

    /// Reads this column from a stored row.
    #[must_use]
    pub fn value_of<'a>(&self, entry: &'a AuditLogEntry) -> &'a str {
        match self {
            Self::Module => entry.module.as_str(),
            Self::Entity => entry.entity.as_str(),
            Self::Action => entry.action.as_str(),
        }
    }
}
