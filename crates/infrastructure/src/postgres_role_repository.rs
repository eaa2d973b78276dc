use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use custodia_application::{
    NewRole, NewRoleAssignment, RoleAssignment, RoleDefinition, RolePatch, RoleRepository,
};
use custodia_core::{AppError, AppResult, TenantId, UserId};
use custodia_domain::{PermissionGrant, RoleCode, RoleKind};

mod assignments;
mod roles;

/// PostgreSQL-backed repository for role administration.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role_id: Uuid,
    tenant_id: Option<Uuid>,
    code: String,
    name: String,
    description: Option<String>,
    is_system: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    permission_code: Option<String>,
}

#[derive(Debug, FromRow)]
struct RoleAssignmentRow {
    tenant_id: Uuid,
    user_id: Uuid,
    role_id: Uuid,
    role_code: String,
    role_name: String,
    assigned_by: Uuid,
    assigned_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl From<RoleAssignmentRow> for RoleAssignment {
    fn from(row: RoleAssignmentRow) -> Self {
        Self {
            tenant_id: TenantId::from_uuid(row.tenant_id),
            user_id: UserId::from_uuid(row.user_id),
            role_id: row.role_id,
            role_code: RoleCode::from_stored(row.role_code),
            role_name: row.role_name,
            assigned_by: UserId::from_uuid(row.assigned_by),
            assigned_at: row.assigned_at,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn list_roles(&self, tenant_id: TenantId) -> AppResult<Vec<RoleDefinition>> {
        fetch_roles(&self.pool, tenant_id, None).await
    }

    async fn find_role(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
    ) -> AppResult<Option<RoleDefinition>> {
        Ok(fetch_roles(&self.pool, tenant_id, Some(role_id))
            .await?
            .into_iter()
            .next())
    }

    async fn create_role(&self, role: NewRole) -> AppResult<RoleDefinition> {
        self.create_role_impl(role).await
    }

    async fn update_role(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
        patch: RolePatch,
    ) -> AppResult<RoleDefinition> {
        self.update_role_impl(tenant_id, role_id, patch).await
    }

    async fn delete_role(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<()> {
        self.delete_role_impl(tenant_id, role_id).await
    }

    async fn assign_role(
        &self,
        tenant_id: TenantId,
        assignment: NewRoleAssignment,
    ) -> AppResult<RoleAssignment> {
        self.assign_role_impl(tenant_id, assignment).await
    }

    async fn unassign_role(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        role_id: Uuid,
    ) -> AppResult<()> {
        self.unassign_role_impl(tenant_id, user_id, role_id).await
    }

    async fn list_role_assignments(
        &self,
        tenant_id: TenantId,
        user_id: Option<UserId>,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.list_role_assignments_impl(tenant_id, user_id).await
    }
}

/// Loads system roles and the tenant's roles, optionally narrowed to one id.
async fn fetch_roles<'e, E>(
    executor: E,
    tenant_id: TenantId,
    role_id: Option<Uuid>,
) -> AppResult<Vec<RoleDefinition>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, RoleRow>(
        r#"
        SELECT
            roles.id AS role_id,
            roles.tenant_id,
            roles.code,
            roles.name,
            roles.description,
            roles.is_system,
            roles.version,
            roles.created_at,
            roles.updated_at,
            permissions.permission_code
        FROM roles
        LEFT JOIN role_permissions AS permissions
            ON permissions.role_id = roles.id
        WHERE (roles.tenant_id IS NULL OR roles.tenant_id = $1)
            AND ($2::UUID IS NULL OR roles.id = $2)
        ORDER BY roles.is_system DESC, roles.name, permissions.permission_code
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(role_id)
    .fetch_all(executor)
    .await
    .map_err(|error| AppError::Internal(format!("failed to load roles: {error}")))?;

    aggregate_roles(rows)
}

fn aggregate_roles(rows: Vec<RoleRow>) -> AppResult<Vec<RoleDefinition>> {
    let mut roles: Vec<RoleDefinition> = Vec::new();
    let mut positions: HashMap<Uuid, usize> = HashMap::new();

    for row in rows {
        let position = *positions.entry(row.role_id).or_insert_with(|| {
            roles.push(RoleDefinition {
                role_id: row.role_id,
                tenant_id: row.tenant_id.map(TenantId::from_uuid),
                code: RoleCode::from_stored(row.code.clone()),
                name: row.name.clone(),
                description: row.description.clone(),
                kind: if row.is_system {
                    RoleKind::System
                } else {
                    RoleKind::Custom
                },
                grants: BTreeSet::new(),
                version: row.version,
                created_at: row.created_at,
                updated_at: row.updated_at,
            });
            roles.len() - 1
        });

        if let Some(code) = row.permission_code {
            let grant = PermissionGrant::from_str(code.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "invalid stored permission '{code}' for role '{}': {error}",
                    row.role_id
                ))
            })?;
            if let Some(role) = roles.get_mut(position) {
                role.grants.insert(grant);
            }
        }
    }

    Ok(roles)
}

async fn insert_grants(
    transaction: &mut Transaction<'_, Postgres>,
    role_id: Uuid,
    grants: &BTreeSet<PermissionGrant>,
) -> AppResult<()> {
    for grant in grants {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_code)
            VALUES ($1, $2)
            ON CONFLICT (role_id, permission_code) DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(grant.code())
        .execute(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist role grants: {error}")))?;
    }

    Ok(())
}

fn database_error_code(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(database_error) => {
            database_error.code().map(|code| code.into_owned())
        }
        _ => None,
    }
}

fn map_role_conflict(error: sqlx::Error, role_name: &str) -> AppError {
    if database_error_code(&error).as_deref() == Some("23505") {
        return AppError::Conflict(format!("role '{role_name}' already exists"));
    }

    AppError::Internal(format!("failed to save role: {error}"))
}

async fn commit(transaction: Transaction<'_, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
}

#[cfg(test)]
mod tests;
