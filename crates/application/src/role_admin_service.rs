use std::collections::BTreeSet;
use std::sync::Arc;

use custodia_core::{AppError, AppResult};
use custodia_domain::{
    AuditAction, AuthorizationContext, Permission, PermissionGrant, PermissionRegistry,
    PermissionScope, RegisteredPermission,
};
use serde_json::Value;
use uuid::Uuid;

use crate::audit_ports::{AuditLogEntryDraft, AuditRepository};
use crate::role_ports::{RoleDefinition, RoleRepository};

mod assignments;
mod roles;

/// Application service for role definition and assignment.
///
/// Every mutation is checked against the caller's held permissions: a caller
/// can only hand out grants it already holds.
#[derive(Clone)]
pub struct RoleAdminService {
    registry: Arc<PermissionRegistry>,
    repository: Arc<dyn RoleRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RoleAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        registry: Arc<PermissionRegistry>,
        repository: Arc<dyn RoleRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            registry,
            repository,
            audit_repository,
        }
    }

    /// Returns the grantable permission catalogue.
    #[must_use]
    pub fn permission_catalog(&self) -> Vec<RegisteredPermission> {
        self.registry.permissions().collect()
    }

    fn require_role_permission(
        &self,
        context: &AuthorizationContext,
        action: &str,
    ) -> AppResult<()> {
        context.require(&Permission::new("role", action, PermissionScope::Tenant)?)
    }

    fn parse_grants(&self, codes: &[String]) -> AppResult<BTreeSet<PermissionGrant>> {
        codes
            .iter()
            .map(|code| self.registry.parse_grant(code.trim()))
            .collect()
    }

    /// Loads a role the caller may mutate: a custom role of its own tenant.
    async fn load_custom_role(
        &self,
        context: &AuthorizationContext,
        role_id: Uuid,
    ) -> AppResult<RoleDefinition> {
        let role = self
            .repository
            .find_role(context.tenant_id(), role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;

        if role.kind.is_system() {
            return Err(AppError::InvariantViolation(format!(
                "system role '{}' cannot be modified",
                role.code
            )));
        }

        Ok(role)
    }

    async fn record(
        &self,
        context: &AuthorizationContext,
        action: AuditAction,
        entity_id: String,
        changes: Value,
    ) -> AppResult<()> {
        self.audit_repository
            .append(AuditLogEntryDraft {
                tenant_id: context.tenant_id(),
                branch_id: context.branch_id(),
                user_id: context.user_id(),
                module: AuditAction::MODULE.to_owned(),
                entity: AuditAction::ENTITY.to_owned(),
                entity_id: Some(entity_id),
                action: action.as_str().to_owned(),
                ip_address: None,
                user_agent: None,
                changes,
                metadata: Value::Object(serde_json::Map::new()),
            })
            .await
    }
}
