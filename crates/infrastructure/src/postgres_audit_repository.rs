use async_trait::async_trait;
use sqlx::PgPool;

use custodia_application::{AuditLogEntryDraft, AuditRepository};
use custodia_core::{AppError, AppResult};

/// PostgreSQL-backed append-only audit repository.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append(&self, draft: AuditLogEntryDraft) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log_entries (
                tenant_id,
                branch_id,
                user_id,
                module,
                entity,
                entity_id,
                action,
                ip_address,
                user_agent,
                changes,
                metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(draft.tenant_id.as_uuid())
        .bind(draft.branch_id.map(|branch_id| branch_id.as_uuid()))
        .bind(draft.user_id.as_uuid())
        .bind(draft.module)
        .bind(draft.entity)
        .bind(draft.entity_id)
        .bind(draft.action)
        .bind(draft.ip_address)
        .bind(draft.user_agent)
        .bind(draft.changes)
        .bind(draft.metadata)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit entry: {error}")))?;

        Ok(())
    }
}
