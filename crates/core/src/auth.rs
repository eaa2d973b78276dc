use serde::{Deserialize, Serialize};

use crate::{BranchId, TenantId, UserId};

/// User information persisted in the authenticated session.
///
/// The sign-in service writes this value; Custodia only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    user_id: UserId,
    display_name: String,
    tenant_id: TenantId,
    branch_id: Option<BranchId>,
}

impl UserIdentity {
    /// Creates a user identity from authentication and tenancy data.
    #[must_use]
    pub fn new(
        user_id: UserId,
        display_name: impl Into<String>,
        tenant_id: TenantId,
        branch_id: Option<BranchId>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            tenant_id,
            branch_id,
        }
    }

    /// Returns the authenticated user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the tenant linked to the identity.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the branch the user is bound to, if any.
    #[must_use]
    pub fn branch_id(&self) -> Option<BranchId> {
        self.branch_id
    }
}
