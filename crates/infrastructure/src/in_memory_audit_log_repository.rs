use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use custodia_application::{
    AuditFilterColumn, AuditLogEntry, AuditLogEntryDraft, AuditLogFilter, AuditLogPage,
    AuditLogRepository, AuditRepository, AuditScope,
};
use custodia_core::AppResult;

/// In-memory append-only audit log.
///
/// Serves both the producer and the read port, so tests can observe what
/// services write.
#[derive(Debug, Default)]
pub struct InMemoryAuditLogRepository {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryAuditLogRepository {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fully formed entry, including its raw payload text.
    pub async fn insert_raw(&self, entry: AuditLogEntry) {
        self.entries.write().await.push(entry);
    }

    /// Returns the number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditLogRepository {
    async fn append(&self, draft: AuditLogEntryDraft) -> AppResult<()> {
        self.entries.write().await.push(AuditLogEntry {
            id: Uuid::new_v4(),
            module: draft.module,
            entity: draft.entity,
            entity_id: draft.entity_id,
            action: draft.action,
            user_id: draft.user_id,
            ip_address: draft.ip_address,
            user_agent: draft.user_agent,
            changes: draft.changes.to_string(),
            metadata: draft.metadata.to_string(),
            tenant_id: draft.tenant_id,
            branch_id: draft.branch_id,
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn find_by_id(&self, scope: AuditScope, id: Uuid) -> AppResult<Option<AuditLogEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .find(|entry| entry.id == id && scope.contains(entry))
            .cloned())
    }

    async fn find_many(
        &self,
        scope: AuditScope,
        filter: AuditLogFilter,
    ) -> AppResult<AuditLogPage> {
        let entries = self.entries.read().await;
        let mut matching = entries
            .iter()
            .filter(|entry| scope.contains(entry) && filter.matches(entry))
            .collect::<Vec<_>>();
        matching.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });

        let total = matching.len() as u64;
        let rows = matching
            .into_iter()
            .skip(usize::try_from(filter.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(AuditLogPage { rows, total })
    }

    async fn distinct_values(
        &self,
        scope: AuditScope,
        column: AuditFilterColumn,
    ) -> AppResult<Vec<String>> {
        let mut values = self
            .entries
            .read()
            .await
            .iter()
            .filter(|entry| scope.contains(entry))
            .map(|entry| column.value_of(entry).to_owned())
            .collect::<Vec<_>>();
        values.sort();
        values.dedup();
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use custodia_application::{
        AuditLogEntryDraft, AuditLogFilter, AuditLogRepository, AuditRepository, AuditScope,
    };
    use custodia_core::{TenantId, UserId};
    use serde_json::json;

    use super::InMemoryAuditLogRepository;

    fn draft(tenant_id: TenantId, action: &str) -> AuditLogEntryDraft {
        AuditLogEntryDraft {
            tenant_id,
            branch_id: None,
            user_id: UserId::new(),
            module: "fees".to_owned(),
            entity: "payment".to_owned(),
            entity_id: None,
            action: action.to_owned(),
            ip_address: None,
            user_agent: None,
            changes: json!({ "amount": 10 }),
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn appended_entries_are_listed_newest_first_per_tenant() {
        let repository = InMemoryAuditLogRepository::new();
        let tenant_id = TenantId::new();
        for action in ["fee.collected", "fee.refunded"] {
            assert!(repository.append(draft(tenant_id, action)).await.is_ok());
        }
        assert!(
            repository
                .append(draft(TenantId::new(), "fee.waived"))
                .await
                .is_ok()
        );

        let page = repository
            .find_many(
                AuditScope {
                    tenant_id,
                    branch_id: None,
                },
                AuditLogFilter {
                    limit: 10,
                    ..AuditLogFilter::default()
                },
            )
            .await
            .unwrap_or_default();

        assert_eq!(page.total, 2);
        assert_eq!(repository.len().await, 3);
        assert!(page.rows[0].created_at >= page.rows[1].created_at);
        assert_eq!(page.rows[0].changes, r#"{"amount":10}"#);
    }
}
