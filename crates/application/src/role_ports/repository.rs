use async_trait::async_trait;
use custodia_core::{AppResult, TenantId, UserId};
use uuid::Uuid;

use super::{NewRole, NewRoleAssignment, RoleAssignment, RoleDefinition, RolePatch};

/// Repository port for role and assignment administration.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Lists system roles and the tenant's custom roles.
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<RoleDefinition>>;

    /// Finds a system role or one of the tenant's custom roles.
    async fn find_role(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
    ) -> AppResult<Option<RoleDefinition>>;

    /// Creates a custom role. A name or code collision is a `Conflict`.
    async fn create_role(&self, role: NewRole) -> AppResult<RoleDefinition>;

    /// Replaces a custom role when its version still matches.
    ///
    /// A version mismatch is a `Conflict`.
    async fn update_role(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
        patch: RolePatch,
    ) -> AppResult<RoleDefinition>;

    /// Deletes a custom role with no assignments.
    ///
    /// The assignment check and the delete happen atomically; remaining
    /// assignments are an `InvariantViolation`.
    async fn delete_role(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<()>;

    /// Assigns a role. A duplicate assignment is a `Conflict`.
    async fn assign_role(
        &self,
        tenant_id: TenantId,
        assignment: NewRoleAssignment,
    ) -> AppResult<RoleAssignment>;

    /// Removes an assignment. A missing assignment is `NotFound`.
    async fn unassign_role(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        role_id: Uuid,
    ) -> AppResult<()>;

    /// Lists assignments in the tenant, optionally for one user.
    async fn list_role_assignments(
        &self,
        tenant_id: TenantId,
        user_id: Option<UserId>,
    ) -> AppResult<Vec<RoleAssignment>>;
}
