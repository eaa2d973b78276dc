use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use custodia_application::{
    AuthorizationRepository, NewRole, NewRoleAssignment, RoleAssignment, RoleDefinition,
    RolePatch, RoleRepository,
};
use custodia_core::{AppError, AppResult, TenantId, UserId};
use custodia_domain::{PermissionGrant, RoleCode, RoleKind};

/// In-memory role store, also answering effective permission lookups.
///
/// Locks are always taken roles first, then assignments, so deletion and
/// assignment serialize the same way row locks do in PostgreSQL.
#[derive(Debug, Default)]
pub struct InMemoryRoleRepository {
    roles: RwLock<HashMap<Uuid, RoleDefinition>>,
    assignments: RwLock<Vec<RoleAssignment>>,
}

impl InMemoryRoleRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a system role with a fixed id.
    pub async fn insert_system_role(
        &self,
        role_id: Uuid,
        code: &str,
        name: &str,
        grants: BTreeSet<PermissionGrant>,
    ) {
        let now = Utc::now();
        self.roles.write().await.insert(
            role_id,
            RoleDefinition {
                role_id,
                tenant_id: None,
                code: RoleCode::from_stored(code),
                name: name.to_owned(),
                description: None,
                kind: RoleKind::System,
                grants,
                version: 1,
                created_at: now,
                updated_at: now,
            },
        );
    }
}

fn visible_to(role: &RoleDefinition, tenant_id: TenantId) -> bool {
    role.tenant_id.is_none_or(|owner| owner == tenant_id)
}

fn collides(role: &RoleDefinition, tenant_id: TenantId, code: &RoleCode, name: &str) -> bool {
    role.tenant_id == Some(tenant_id)
        && (&role.code == code || role.name.to_lowercase() == name.to_lowercase())
}

fn sorted(mut roles: Vec<RoleDefinition>) -> Vec<RoleDefinition> {
    roles.sort_by(|left, right| {
        right
            .kind
            .is_system()
            .cmp(&left.kind.is_system())
            .then_with(|| left.name.cmp(&right.name))
    });
    roles
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<RoleDefinition>> {
        Ok(sorted(
            self.roles
                .read()
                .await
                .values()
                .filter(|role| visible_to(role, tenant_id))
                .cloned()
                .collect(),
        ))
    }

    async fn find_role(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
    ) -> AppResult<Option<RoleDefinition>> {
        Ok(self
            .roles
            .read()
            .await
            .get(&role_id)
            .filter(|role| visible_to(role, tenant_id))
            .cloned())
    }

    async fn create_role(&self, role: NewRole) -> AppResult<RoleDefinition> {
        let mut roles = self.roles.write().await;
        if roles
            .values()
            .any(|stored| collides(stored, role.tenant_id, &role.code, &role.name))
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }

        let now = Utc::now();
        let created = RoleDefinition {
            role_id: Uuid::new_v4(),
            tenant_id: Some(role.tenant_id),
            code: role.code,
            name: role.name,
            description: role.description,
            kind: RoleKind::Custom,
            grants: role.grants,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        roles.insert(created.role_id, created.clone());
        Ok(created)
    }

    async fn update_role(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
        patch: RolePatch,
    ) -> AppResult<RoleDefinition> {
        let mut roles = self.roles.write().await;
        if roles.values().any(|stored| {
            stored.role_id != role_id && collides(stored, tenant_id, &patch.code, &patch.name)
        }) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                patch.name
            )));
        }

        let role = roles
            .get_mut(&role_id)
            .filter(|role| role.tenant_id == Some(tenant_id) && !role.kind.is_system())
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;
        if role.version != patch.expected_version {
            return Err(AppError::Conflict(format!(
                "role '{role_id}' was modified concurrently (version {}, expected {})",
                role.version, patch.expected_version
            )));
        }

        role.code = patch.code;
        role.name = patch.name;
        role.description = patch.description;
        role.grants = patch.grants;
        role.version += 1;
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    async fn delete_role(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        let assignments = self.assignments.read().await;

        let role = roles
            .get(&role_id)
            .filter(|role| visible_to(role, tenant_id))
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;
        if role.kind.is_system() {
            return Err(AppError::InvariantViolation(format!(
                "system role '{role_id}' cannot be deleted"
            )));
        }

        let assignment_count = assignments
            .iter()
            .filter(|assignment| assignment.role_id == role_id)
            .count();
        if assignment_count > 0 {
            return Err(AppError::InvariantViolation(format!(
                "role '{role_id}' still has {assignment_count} assignment(s)"
            )));
        }

        roles.remove(&role_id);
        Ok(())
    }

    async fn assign_role(
        &self,
        tenant_id: TenantId,
        assignment: NewRoleAssignment,
    ) -> AppResult<RoleAssignment> {
        let roles = self.roles.read().await;
        let mut assignments = self.assignments.write().await;

        let role = roles
            .get(&assignment.role_id)
            .filter(|role| visible_to(role, tenant_id))
            .ok_or_else(|| {
                AppError::NotFound(format!("role '{}' does not exist", assignment.role_id))
            })?;
        if assignments.iter().any(|stored| {
            stored.tenant_id == tenant_id
                && stored.user_id == assignment.user_id
                && stored.role_id == assignment.role_id
        }) {
            return Err(AppError::Conflict(format!(
                "user '{}' already holds role '{}'",
                assignment.user_id, assignment.role_id
            )));
        }

        let stored = RoleAssignment {
            tenant_id,
            user_id: assignment.user_id,
            role_id: role.role_id,
            role_code: role.code.clone(),
            role_name: role.name.clone(),
            assigned_by: assignment.assigned_by,
            assigned_at: Utc::now(),
            expires_at: assignment.expires_at,
        };
        assignments.push(stored.clone());
        Ok(stored)
    }

    async fn unassign_role(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        role_id: Uuid,
    ) -> AppResult<()> {
        let mut assignments = self.assignments.write().await;
        let before = assignments.len();
        assignments.retain(|assignment| {
            !(assignment.tenant_id == tenant_id
                && assignment.user_id == user_id
                && assignment.role_id == role_id)
        });

        if assignments.len() == before {
            return Err(AppError::NotFound(format!(
                "role assignment '{user_id}:{role_id}' was not found"
            )));
        }

        Ok(())
    }

    async fn list_role_assignments(
        &self,
        tenant_id: TenantId,
        user_id: Option<UserId>,
    ) -> AppResult<Vec<RoleAssignment>> {
        let mut listed = self
            .assignments
            .read()
            .await
            .iter()
            .filter(|assignment| {
                assignment.tenant_id == tenant_id
                    && user_id.is_none_or(|user_id| assignment.user_id == user_id)
            })
            .cloned()
            .collect::<Vec<_>>();
        listed.sort_by(|left, right| {
            left.user_id
                .cmp(&right.user_id)
                .then_with(|| left.role_name.cmp(&right.role_name))
        });
        Ok(listed)
    }
}

#[async_trait]
impl AuthorizationRepository for InMemoryRoleRepository {
    async fn list_permission_codes_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<String>> {
        let roles = self.roles.read().await;
        let assignments = self.assignments.read().await;

        let codes = assignments
            .iter()
            .filter(|assignment| {
                assignment.tenant_id == tenant_id
                    && assignment.user_id == user_id
                    && assignment.is_active_at(now)
            })
            .filter_map(|assignment| roles.get(&assignment.role_id))
            .filter(|role| visible_to(role, tenant_id))
            .flat_map(|role| role.grants.iter().map(PermissionGrant::code))
            .collect::<BTreeSet<_>>();

        Ok(codes.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::str::FromStr;

    use chrono::{Duration, Utc};
    use custodia_application::{
        AuthorizationRepository, NewRole, NewRoleAssignment, RoleRepository,
    };
    use custodia_core::{AppError, TenantId, UserId};
    use custodia_domain::{PermissionGrant, RoleCode};
    use uuid::Uuid;

    use super::InMemoryRoleRepository;

    fn grants(codes: &[&str]) -> BTreeSet<PermissionGrant> {
        codes
            .iter()
            .map(|code| PermissionGrant::from_str(code).unwrap_or_else(|error| panic!("{error}")))
            .collect()
    }

    #[tokio::test]
    async fn system_role_is_shared_but_not_deletable() {
        let repository = InMemoryRoleRepository::new();
        let role_id = Uuid::new_v4();
        repository
            .insert_system_role(role_id, "auditor", "Auditor", grants(&["audit:read:tenant"]))
            .await;

        let tenant_id = TenantId::new();
        assert_eq!(repository.list_roles(tenant_id).await.unwrap_or_default().len(), 1);
        assert!(matches!(
            repository.delete_role(tenant_id, role_id).await,
            Err(AppError::InvariantViolation(_))
        ));
    }

    #[tokio::test]
    async fn active_assignments_feed_effective_permissions() {
        let repository = InMemoryRoleRepository::new();
        let tenant_id = TenantId::new();
        let user_id = UserId::new();

        let role = repository
            .create_role(NewRole {
                tenant_id,
                code: RoleCode::from_stored("transport_desk"),
                name: "Transport Desk".to_owned(),
                description: None,
                grants: grants(&["transport:*"]),
            })
            .await;
        assert!(role.is_ok());
        let Ok(role) = role else {
            return;
        };

        let assigned = repository
            .assign_role(
                tenant_id,
                NewRoleAssignment {
                    user_id,
                    role_id: role.role_id,
                    assigned_by: UserId::new(),
                    expires_at: Some(Utc::now() + Duration::minutes(1)),
                },
            )
            .await;
        assert!(assigned.is_ok());

        let now = repository
            .list_permission_codes_for_user(tenant_id, user_id, Utc::now())
            .await
            .unwrap_or_default();
        assert_eq!(now, vec!["transport:*".to_owned()]);

        let later = repository
            .list_permission_codes_for_user(tenant_id, user_id, Utc::now() + Duration::hours(1))
            .await
            .unwrap_or_default();
        assert!(later.is_empty());

        assert!(matches!(
            repository.delete_role(tenant_id, role.role_id).await,
            Err(AppError::InvariantViolation(_))
        ));
    }
}
