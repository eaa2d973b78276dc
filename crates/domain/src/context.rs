use custodia_core::{AppError, AppResult, BranchId, TenantId, UserId};

use crate::permission::{Permission, PermissionScope};
use crate::resolver::PermissionSet;

/// Request-scoped authorization context.
///
/// Built once per request from the authenticated identity and the user's
/// freshly computed effective permissions. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationContext {
    tenant_id: TenantId,
    branch_id: Option<BranchId>,
    user_id: UserId,
    held: PermissionSet,
}

impl AuthorizationContext {
    /// Creates a context.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        branch_id: Option<BranchId>,
        user_id: UserId,
        held: PermissionSet,
    ) -> Self {
        Self {
            tenant_id,
            branch_id,
            user_id,
            held,
        }
    }

    /// Returns the caller's tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the caller's branch, when bound to one.
    #[must_use]
    pub fn branch_id(&self) -> Option<BranchId> {
        self.branch_id
    }

    /// Returns the caller.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the caller's held permissions.
    #[must_use]
    pub fn held(&self) -> &PermissionSet {
        &self.held
    }

    /// Narrowest scope that still covers the caller's own data partition.
    #[must_use]
    pub fn data_scope(&self) -> PermissionScope {
        if self.branch_id.is_some() {
            PermissionScope::Branch
        } else {
            PermissionScope::Tenant
        }
    }

    /// Fails with `Forbidden` unless the permission is held.
    pub fn require(&self, permission: &Permission) -> AppResult<()> {
        if self.held.allows(permission) {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "user '{}' is missing permission '{permission}' in tenant '{}'",
            self.user_id, self.tenant_id
        )))
    }
}
