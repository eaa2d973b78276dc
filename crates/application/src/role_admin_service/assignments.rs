use super::*;

use chrono::{DateTime, Utc};
use custodia_core::UserId;
use custodia_domain::ensure_grantable;
use serde_json::json;

use crate::role_ports::{NewRoleAssignment, RoleAssignment};

impl RoleAdminService {
    /// Assigns a role to a user in the caller's tenant and records it.
    ///
    /// The caller must itself hold every grant of the assigned role.
    pub async fn assign_role(
        &self,
        context: &AuthorizationContext,
        user_id: UserId,
        role_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<RoleAssignment> {
        self.require_role_permission(context, "assign")?;

        if let Some(expires_at) = expires_at
            && expires_at <= Utc::now()
        {
            return Err(AppError::Validation(format!(
                "assignment expiry '{}' must be in the future",
                expires_at.to_rfc3339()
            )));
        }

        let role = self
            .repository
            .find_role(context.tenant_id(), role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;
        ensure_grantable(context.held(), &role.grants)?;

        let assignment = self
            .repository
            .assign_role(
                context.tenant_id(),
                NewRoleAssignment {
                    user_id,
                    role_id,
                    assigned_by: context.user_id(),
                    expires_at,
                },
            )
            .await?;

        self.record(
            context,
            AuditAction::RoleAssigned,
            role_id.to_string(),
            json!({
                "userId": user_id.to_string(),
                "role": role.code.as_str(),
                "expiresAt": expires_at.map(|value| value.to_rfc3339()),
            }),
        )
        .await?;

        Ok(assignment)
    }

    /// Removes a role assignment and records it.
    pub async fn unassign_role(
        &self,
        context: &AuthorizationContext,
        user_id: UserId,
        role_id: Uuid,
    ) -> AppResult<()> {
        self.require_role_permission(context, "assign")?;

        self.repository
            .unassign_role(context.tenant_id(), user_id, role_id)
            .await?;

        self.record(
            context,
            AuditAction::RoleUnassigned,
            role_id.to_string(),
            json!({ "userId": user_id.to_string() }),
        )
        .await
    }

    /// Lists assignments in the caller's tenant, optionally for one user.
    pub async fn list_role_assignments(
        &self,
        context: &AuthorizationContext,
        user_id: Option<UserId>,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.require_role_permission(context, "read")?;
        self.repository
            .list_role_assignments(context.tenant_id(), user_id)
            .await
    }
}
