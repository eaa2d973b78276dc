use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use custodia_application::AuthorizationRepository;
use custodia_core::{AppError, AppResult, TenantId, UserId};
use custodia_domain::PermissionGrant;

/// PostgreSQL-backed repository for effective permission lookups.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn list_permission_codes_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<String>> {
        let codes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT permissions.permission_code
            FROM role_assignments AS assignments
            INNER JOIN roles
                ON roles.id = assignments.role_id
            INNER JOIN role_permissions AS permissions
                ON permissions.role_id = roles.id
            WHERE assignments.tenant_id = $1
                AND assignments.user_id = $2
                AND (roles.tenant_id IS NULL OR roles.tenant_id = assignments.tenant_id)
                AND (assignments.expires_at IS NULL OR assignments.expires_at > $3)
            ORDER BY permissions.permission_code
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load permissions: {error}")))?;

        Ok(codes
            .into_iter()
            .filter(|code| {
                let valid = PermissionGrant::from_str(code).is_ok();
                if !valid {
                    tracing::warn!(
                        tenant_id = %tenant_id,
                        user_id = %user_id,
                        permission_code = %code,
                        "ignoring malformed stored permission code"
                    );
                }
                valid
            })
            .collect())
    }
}
