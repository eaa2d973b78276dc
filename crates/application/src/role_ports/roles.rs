use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use custodia_core::{TenantId, UserId};
use custodia_domain::{PermissionGrant, RoleCode, RoleKind};
use uuid::Uuid;

/// Role definition returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    /// Stable role identifier.
    pub role_id: Uuid,
    /// Owning tenant, `None` for system roles.
    pub tenant_id: Option<TenantId>,
    /// Code derived from the name.
    pub code: RoleCode,
    /// Unique role name in tenant scope.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// System or custom.
    pub kind: RoleKind,
    /// Grants held by the role.
    pub grants: BTreeSet<PermissionGrant>,
    /// Optimistic concurrency counter, bumped on every update.
    pub version: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl RoleDefinition {
    /// Returns the grant codes in code order.
    #[must_use]
    pub fn permission_codes(&self) -> Vec<String> {
        self.grants.iter().map(PermissionGrant::code).collect()
    }
}

/// Assignment of a role to a user inside a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// Tenant the assignment applies in.
    pub tenant_id: TenantId,
    /// Assigned user.
    pub user_id: UserId,
    /// Role identifier.
    pub role_id: Uuid,
    /// Role code.
    pub role_code: RoleCode,
    /// Role name.
    pub role_name: String,
    /// User who made the assignment.
    pub assigned_by: UserId,
    /// Assignment time.
    pub assigned_at: DateTime<Utc>,
    /// Time after which the assignment stops granting anything.
    pub expires_at: Option<DateTime<Utc>>,
}

impl RoleAssignment {
    /// Returns whether the assignment still grants permissions at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}
