use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use custodia_application::{
    AuditFilterColumn, AuditLogEntry, AuditLogFilter, AuditLogPage, AuditLogRepository, AuditScope,
};
use custodia_core::{AppError, AppResult, BranchId, TenantId, UserId};

/// PostgreSQL-backed read-only view of the audit log.
///
/// Payload columns are read back as text; decoding and masking happen in
/// the query service.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    id: Uuid,
    module: String,
    entity: String,
    entity_id: Option<String>,
    action: String,
    user_id: Uuid,
    ip_address: Option<String>,
    user_agent: Option<String>,
    changes: String,
    metadata: String,
    tenant_id: Uuid,
    branch_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLogEntry {
    fn from(row: AuditLogRow) -> Self {
        Self {
            id: row.id,
            module: row.module,
            entity: row.entity,
            entity_id: row.entity_id,
            action: row.action,
            user_id: UserId::from_uuid(row.user_id),
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            changes: row.changes,
            metadata: row.metadata,
            tenant_id: TenantId::from_uuid(row.tenant_id),
            branch_id: row.branch_id.map(BranchId::from_uuid),
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn find_by_id(&self, scope: AuditScope, id: Uuid) -> AppResult<Option<AuditLogEntry>> {
        let row = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT
                id,
                module,
                entity,
                entity_id,
                action,
                user_id,
                ip_address,
                user_agent,
                changes::TEXT AS changes,
                metadata::TEXT AS metadata,
                tenant_id,
                branch_id,
                created_at
            FROM audit_log_entries
            WHERE id = $1
                AND tenant_id = $2
                AND ($3::UUID IS NULL OR branch_id = $3)
            "#,
        )
        .bind(id)
        .bind(scope.tenant_id.as_uuid())
        .bind(scope.branch_id.map(|branch_id| branch_id.as_uuid()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load audit log entry: {error}")))?;

        Ok(row.map(AuditLogEntry::from))
    }

    async fn find_many(
        &self,
        scope: AuditScope,
        filter: AuditLogFilter,
    ) -> AppResult<AuditLogPage> {
        let branch_id = scope.branch_id.map(|branch_id| branch_id.as_uuid());
        let user_id = filter.user_id.map(|user_id| user_id.as_uuid());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM audit_log_entries
            WHERE tenant_id = $1
                AND ($2::UUID IS NULL OR branch_id = $2)
                AND ($3::TEXT IS NULL OR module = $3)
                AND ($4::TEXT IS NULL OR entity = $4)
                AND ($5::TEXT IS NULL OR action = $5)
                AND ($6::UUID IS NULL OR user_id = $6)
                AND ($7::TIMESTAMPTZ IS NULL OR created_at >= $7)
                AND ($8::TIMESTAMPTZ IS NULL OR created_at < $8)
            "#,
        )
        .bind(scope.tenant_id.as_uuid())
        .bind(branch_id)
        .bind(filter.module.as_deref())
        .bind(filter.entity.as_deref())
        .bind(filter.action.as_deref())
        .bind(user_id)
        .bind(filter.created_from)
        .bind(filter.created_before)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count audit log entries: {error}")))?;

        let offset = i64::try_from(filter.offset).map_err(|_| {
            AppError::Validation(format!("audit log offset {} is out of range", filter.offset))
        })?;

        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT
                id,
                module,
                entity,
                entity_id,
                action,
                user_id,
                ip_address,
                user_agent,
                changes::TEXT AS changes,
                metadata::TEXT AS metadata,
                tenant_id,
                branch_id,
                created_at
            FROM audit_log_entries
            WHERE tenant_id = $1
                AND ($2::UUID IS NULL OR branch_id = $2)
                AND ($3::TEXT IS NULL OR module = $3)
                AND ($4::TEXT IS NULL OR entity = $4)
                AND ($5::TEXT IS NULL OR action = $5)
                AND ($6::UUID IS NULL OR user_id = $6)
                AND ($7::TIMESTAMPTZ IS NULL OR created_at >= $7)
                AND ($8::TIMESTAMPTZ IS NULL OR created_at < $8)
            ORDER BY created_at DESC, id DESC
            LIMIT $9
            OFFSET $10
            "#,
        )
        .bind(scope.tenant_id.as_uuid())
        .bind(branch_id)
        .bind(filter.module.as_deref())
        .bind(filter.entity.as_deref())
        .bind(filter.action.as_deref())
        .bind(user_id)
        .bind(filter.created_from)
        .bind(filter.created_before)
        .bind(i64::from(filter.limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audit log entries: {error}")))?;

        Ok(AuditLogPage {
            rows: rows.into_iter().map(AuditLogEntry::from).collect(),
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn distinct_values(
        &self,
        scope: AuditScope,
        column: AuditFilterColumn,
    ) -> AppResult<Vec<String>> {
        let column = column.column_name();
        let statement = format!(
            r#"
            SELECT DISTINCT {column}
            FROM audit_log_entries
            WHERE tenant_id = $1
                AND ($2::UUID IS NULL OR branch_id = $2)
            ORDER BY {column}
            "#
        );

        sqlx::query_scalar::<_, String>(statement.as_str())
            .bind(scope.tenant_id.as_uuid())
            .bind(scope.branch_id.map(|branch_id| branch_id.as_uuid()))
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list distinct audit {column} values: {error}"))
            })
    }
}
