use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use custodia_core::{TenantId, UserId};
use custodia_domain::{PermissionGrant, RoleCode};
use uuid::Uuid;

/// Transport payload for creating a custom role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Role name, unique in the tenant.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Permission codes, possibly wildcards.
    pub permissions: Vec<String>,
}

/// Transport payload for changing a custom role. Absent fields stay as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateRoleInput {
    /// Replacement name.
    pub name: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement permission codes.
    pub permissions: Option<Vec<String>>,
    /// Version the caller last read.
    pub expected_version: Option<i64>,
}

/// Validated role ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Derived code.
    pub code: RoleCode,
    /// Role name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Grants.
    pub grants: BTreeSet<PermissionGrant>,
}

/// Complete replacement state for a custom role.
///
/// Storage applies it only while the stored version still equals
/// `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePatch {
    /// Code derived from `name`.
    pub code: RoleCode,
    /// Role name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Grants.
    pub grants: BTreeSet<PermissionGrant>,
    /// Version the patch was computed from.
    pub expected_version: i64,
}

/// Validated assignment ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoleAssignment {
    /// Assigned user.
    pub user_id: UserId,
    /// Role identifier.
    pub role_id: Uuid,
    /// Acting user.
    pub assigned_by: UserId,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}
