use super::*;

use custodia_core::NonEmptyString;
use custodia_domain::{GrantDiff, RoleCode, ensure_grantable};
use serde_json::json;

use crate::role_ports::{CreateRoleInput, NewRole, RolePatch, UpdateRoleInput};

impl RoleAdminService {
    /// Returns system roles and the caller's tenant roles.
    pub async fn list_roles(
        &self,
        context: &AuthorizationContext,
    ) -> AppResult<Vec<RoleDefinition>> {
        self.require_role_permission(context, "read")?;
        self.repository.list_roles(context.tenant_id()).await
    }

    /// Returns one role visible to the caller's tenant.
    pub async fn get_role(
        &self,
        context: &AuthorizationContext,
        role_id: Uuid,
    ) -> AppResult<RoleDefinition> {
        self.require_role_permission(context, "read")?;
        self.repository
            .find_role(context.tenant_id(), role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    /// Creates a custom role in the caller's tenant and records it.
    pub async fn create_role(
        &self,
        context: &AuthorizationContext,
        input: CreateRoleInput,
    ) -> AppResult<RoleDefinition> {
        self.require_role_permission(context, "create")?;

        let name = NonEmptyString::new(input.name.trim())?;
        let code = RoleCode::from_name(name.as_str())?;
        let grants = self.parse_grants(&input.permissions)?;
        ensure_grantable(context.held(), &grants)?;

        let role = self
            .repository
            .create_role(NewRole {
                tenant_id: context.tenant_id(),
                code,
                name: String::from(name),
                description: normalize_description(input.description),
                grants,
            })
            .await?;

        self.record(
            context,
            AuditAction::RoleCreated,
            role.role_id.to_string(),
            json!({
                "code": role.code.as_str(),
                "name": role.name,
                "permissions": role.permission_codes(),
            }),
        )
        .await?;

        Ok(role)
    }

    /// Applies a patch to a custom role and records the grant diff.
    ///
    /// Only grants the patch adds are checked against the caller; removals
    /// never escalate. The repository rejects the write when the role changed
    /// since it was read here, so the check always covers the replaced state.
    pub async fn update_role(
        &self,
        context: &AuthorizationContext,
        role_id: Uuid,
        input: UpdateRoleInput,
    ) -> AppResult<RoleDefinition> {
        self.require_role_permission(context, "update")?;

        let current = self.load_custom_role(context, role_id).await?;
        if let Some(expected_version) = input.expected_version
            && expected_version != current.version
        {
            return Err(AppError::Conflict(format!(
                "role '{role_id}' is at version {} but version {expected_version} was expected",
                current.version
            )));
        }

        let grants = match input.permissions {
            Some(codes) => self.parse_grants(&codes)?,
            None => current.grants.clone(),
        };
        let diff = GrantDiff::between(&current.grants, &grants);
        ensure_grantable(context.held(), &diff.added)?;

        let (name, code) = match input.name {
            Some(name) => {
                let name = NonEmptyString::new(name.trim())?;
                let code = RoleCode::from_name(name.as_str())?;
                (String::from(name), code)
            }
            None => (current.name.clone(), current.code.clone()),
        };
        let description = match input.description {
            Some(description) => normalize_description(Some(description)),
            None => current.description.clone(),
        };

        let role = self
            .repository
            .update_role(
                context.tenant_id(),
                role_id,
                RolePatch {
                    code,
                    name,
                    description,
                    grants,
                    expected_version: current.version,
                },
            )
            .await?;

        self.record(
            context,
            AuditAction::RoleUpdated,
            role.role_id.to_string(),
            json!({
                "name": { "from": current.name, "to": role.name },
                "addedPermissions": diff.added.iter().map(PermissionGrant::code).collect::<Vec<_>>(),
                "removedPermissions": diff.removed.iter().map(PermissionGrant::code).collect::<Vec<_>>(),
                "version": role.version,
            }),
        )
        .await?;

        Ok(role)
    }

    /// Deletes an unassigned custom role and records it.
    pub async fn delete_role(&self, context: &AuthorizationContext, role_id: Uuid) -> AppResult<()> {
        self.require_role_permission(context, "delete")?;

        let role = self.load_custom_role(context, role_id).await?;
        self.repository
            .delete_role(context.tenant_id(), role_id)
            .await?;

        self.record(
            context,
            AuditAction::RoleDeleted,
            role_id.to_string(),
            json!({
                "code": role.code.as_str(),
                "name": role.name,
                "permissions": role.permission_codes(),
            }),
        )
        .await
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
