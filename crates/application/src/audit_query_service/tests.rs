use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use custodia_core::{AppError, AppResult, BranchId, TenantId, UserId};
use custodia_domain::{AuthorizationContext, MASK_TOKEN, PermissionSet};
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::audit_ports::{
    AuditFilterColumn, AuditLogEntry, AuditLogFilter, AuditLogPage, AuditLogRepository,
    AuditScope,
};

use super::{AuditLogQuery, AuditPageLimits, AuditQueryService};

#[derive(Default)]
struct FakeAuditLogRepository {
    entries: Mutex<Vec<AuditLogEntry>>,
    last_filter: Mutex<Option<AuditLogFilter>>,
}

#[async_trait]
impl AuditLogRepository for FakeAuditLogRepository {
    async fn find_by_id(&self, scope: AuditScope, id: Uuid) -> AppResult<Option<AuditLogEntry>> {
        Ok(self
            .entries
            .lock()
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
        let mut rows = self
            .entries
            .lock()
            .await
            .iter()
            .filter(|entry| scope.contains(entry) && filter.matches(entry))
            .cloned()
            .collect::<Vec<_>>();
        rows.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then(right.id.cmp(&left.id))
        });
        let total = rows.len() as u64;
        let rows = rows
            .into_iter()
            .skip(usize::try_from(filter.offset).unwrap_or(usize::MAX))
            .take(filter.limit as usize)
            .collect();
        *self.last_filter.lock().await = Some(filter);
        Ok(AuditLogPage { rows, total })
    }

    async fn distinct_values(
        &self,
        scope: AuditScope,
        column: AuditFilterColumn,
    ) -> AppResult<Vec<String>> {
        let mut values = self
            .entries
            .lock()
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

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid test timestamp"))
}

fn entry(
    tenant_id: TenantId,
    branch_id: Option<BranchId>,
    module: &str,
    action: &str,
    created_at: DateTime<Utc>,
) -> AuditLogEntry {
    AuditLogEntry {
        id: Uuid::new_v4(),
        module: module.to_owned(),
        entity: "student".to_owned(),
        entity_id: Some("42".to_owned()),
        action: action.to_owned(),
        user_id: UserId::new(),
        ip_address: Some("10.0.0.1".to_owned()),
        user_agent: None,
        changes: json!({ "changes": { "password": "x", "email": "a@b.com" } }).to_string(),
        metadata: "{}".to_owned(),
        tenant_id,
        branch_id,
        created_at,
    }
}

fn reader(tenant_id: TenantId, branch_id: Option<BranchId>, codes: &[&str]) -> AuthorizationContext {
    AuthorizationContext::new(
        tenant_id,
        branch_id,
        UserId::new(),
        PermissionSet::from_codes(codes).unwrap_or_else(|error| panic!("{error}")),
    )
}

async fn service_with(entries: Vec<AuditLogEntry>) -> (AuditQueryService, Arc<FakeAuditLogRepository>) {
    let repository = Arc::new(FakeAuditLogRepository::default());
    repository.entries.lock().await.extend(entries);
    (
        AuditQueryService::new(repository.clone(), AuditPageLimits::default()),
        repository,
    )
}

#[tokio::test]
async fn get_by_id_masks_sensitive_fields() {
    let tenant_id = TenantId::new();
    let stored = entry(tenant_id, None, "students", "student.updated", at(2, 9));
    let id = stored.id;
    let (service, _) = service_with(vec![stored]).await;

    let view = service
        .get_by_id(&reader(tenant_id, None, &["audit:read:tenant"]), id)
        .await;
    assert!(view.is_ok());
    let Ok(view) = view else {
        return;
    };

    assert_eq!(
        view.changes,
        json!({ "changes": { "password": MASK_TOKEN, "email": "a@b.com" } })
    );
    assert_eq!(view.metadata, json!({}));
}

#[tokio::test]
async fn get_by_id_hides_other_tenants_and_branches_as_not_found() {
    let tenant_id = TenantId::new();
    let branch_id = BranchId::new();
    let foreign = entry(TenantId::new(), None, "fees", "fee.collected", at(2, 9));
    let other_branch = entry(tenant_id, Some(BranchId::new()), "fees", "fee.collected", at(2, 9));
    let foreign_id = foreign.id;
    let other_branch_id = other_branch.id;
    let (service, _) = service_with(vec![foreign, other_branch]).await;

    let tenant_reader = reader(tenant_id, None, &["audit:read:tenant"]);
    let missing = service.get_by_id(&tenant_reader, Uuid::new_v4()).await;
    let cross_tenant = service.get_by_id(&tenant_reader, foreign_id).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    assert!(matches!(cross_tenant, Err(AppError::NotFound(_))));
    if let (Err(missing), Err(cross_tenant)) = (missing, cross_tenant) {
        assert_eq!(missing.code(), cross_tenant.code());
    }

    let branch_reader = reader(tenant_id, Some(branch_id), &["audit:read:branch"]);
    let cross_branch = service.get_by_id(&branch_reader, other_branch_id).await;
    assert!(matches!(cross_branch, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn oversized_limit_is_clamped_to_the_maximum() {
    let tenant_id = TenantId::new();
    let (service, repository) =
        service_with(vec![entry(tenant_id, None, "fees", "fee.collected", at(2, 9))]).await;

    let listing = service
        .list(
            &reader(tenant_id, None, &["audit:read:tenant"]),
            AuditLogQuery {
                limit: Some(500),
                ..AuditLogQuery::default()
            },
        )
        .await;
    assert!(listing.is_ok());
    let Ok(listing) = listing else {
        return;
    };

    assert_eq!(listing.pagination.limit, 100);
    assert_eq!(listing.pagination.page, 1);
    assert_eq!(listing.pagination.total, 1);
    assert_eq!(listing.pagination.total_pages, 1);
    assert_eq!(
        repository
            .last_filter
            .lock()
            .await
            .as_ref()
            .map(|filter| filter.limit),
        Some(100)
    );
}

#[tokio::test]
async fn non_positive_page_or_limit_is_rejected() {
    let tenant_id = TenantId::new();
    let (service, _) = service_with(Vec::new()).await;
    let caller = reader(tenant_id, None, &["audit:read:tenant"]);

    for query in [
        AuditLogQuery {
            page: Some(0),
            ..AuditLogQuery::default()
        },
        AuditLogQuery {
            limit: Some(0),
            ..AuditLogQuery::default()
        },
        AuditLogQuery {
            limit: Some(-3),
            ..AuditLogQuery::default()
        },
    ] {
        let result = service.list(&caller, query).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}

#[tokio::test]
async fn list_pages_newest_first_within_scope() {
    let tenant_id = TenantId::new();
    let entries = (1..=5)
        .map(|day| entry(tenant_id, None, "fees", "fee.collected", at(day, 12)))
        .chain([entry(TenantId::new(), None, "fees", "fee.collected", at(9, 12))])
        .collect::<Vec<_>>();
    let (service, _) = service_with(entries).await;
    let caller = reader(tenant_id, None, &["audit:*"]);

    let second_page = service
        .list(
            &caller,
            AuditLogQuery {
                page: Some(2),
                limit: Some(2),
                ..AuditLogQuery::default()
            },
        )
        .await;
    assert!(second_page.is_ok());
    let Ok(second_page) = second_page else {
        return;
    };

    let days = second_page
        .items
        .iter()
        .map(|item| item.created_at)
        .collect::<Vec<_>>();
    assert_eq!(days, vec![at(3, 12), at(2, 12)]);
    assert_eq!(second_page.pagination.total, 5);
    assert_eq!(second_page.pagination.total_pages, 3);
    assert!(
        second_page
            .items
            .iter()
            .all(|item| item.tenant_id == tenant_id)
    );
}

#[tokio::test]
async fn end_date_includes_its_whole_day() {
    let tenant_id = TenantId::new();
    let entries = vec![
        entry(tenant_id, None, "fees", "fee.collected", at(1, 23)),
        entry(tenant_id, None, "fees", "fee.collected", at(2, 0)),
        entry(tenant_id, None, "fees", "fee.collected", at(3, 23)),
        entry(tenant_id, None, "fees", "fee.collected", at(4, 0)),
    ];
    let (service, _) = service_with(entries).await;

    let listing = service
        .list(
            &reader(tenant_id, None, &["audit:read:tenant"]),
            AuditLogQuery {
                start_date: Some("2026-03-02".to_owned()),
                end_date: Some("2026-03-03".to_owned()),
                ..AuditLogQuery::default()
            },
        )
        .await;

    let times = listing
        .map(|listing| {
            listing
                .items
                .into_iter()
                .map(|item| item.created_at)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    assert_eq!(times, vec![at(3, 23), at(2, 0)]);
}

#[tokio::test]
async fn inverted_or_malformed_dates_are_rejected() {
    let tenant_id = TenantId::new();
    let (service, _) = service_with(Vec::new()).await;
    let caller = reader(tenant_id, None, &["audit:read:tenant"]);

    let inverted = service
        .list(
            &caller,
            AuditLogQuery {
                start_date: Some("2026-03-05".to_owned()),
                end_date: Some("2026-03-01".to_owned()),
                ..AuditLogQuery::default()
            },
        )
        .await;
    assert!(matches!(inverted, Err(AppError::Validation(_))));

    let malformed = service
        .list(
            &caller,
            AuditLogQuery {
                start_date: Some("03/05/2026".to_owned()),
                ..AuditLogQuery::default()
            },
        )
        .await;
    assert!(matches!(malformed, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn equality_filters_narrow_the_listing() {
    let tenant_id = TenantId::new();
    let mut target = entry(tenant_id, None, "fees", "fee.refunded", at(2, 9));
    let user_id = UserId::new();
    target.user_id = user_id;
    let entries = vec![
        target,
        entry(tenant_id, None, "fees", "fee.collected", at(2, 10)),
        entry(tenant_id, None, "exams", "fee.refunded", at(2, 11)),
    ];
    let (service, _) = service_with(entries).await;

    let listing = service
        .list(
            &reader(tenant_id, None, &["audit:read:tenant"]),
            AuditLogQuery {
                module: Some("fees".to_owned()),
                action: Some("fee.refunded".to_owned()),
                user_id: Some(user_id.to_string()),
                ..AuditLogQuery::default()
            },
        )
        .await;

    assert_eq!(
        listing.map(|listing| listing.pagination.total).unwrap_or_default(),
        1
    );
}

#[tokio::test]
async fn branch_bound_reader_needs_branch_scope_and_sees_only_its_branch() {
    let tenant_id = TenantId::new();
    let branch_id = BranchId::new();
    let entries = vec![
        entry(tenant_id, Some(branch_id), "fees", "fee.collected", at(2, 9)),
        entry(tenant_id, Some(BranchId::new()), "exams", "exam.graded", at(2, 9)),
        entry(tenant_id, None, "billing", "billing.changed", at(2, 9)),
    ];
    let (service, _) = service_with(entries).await;

    let without_grant = service
        .get_filter_options(&reader(tenant_id, Some(branch_id), &["student:read:branch"]))
        .await;
    assert!(matches!(without_grant, Err(AppError::Forbidden(_))));

    let options = service
        .get_filter_options(&reader(tenant_id, Some(branch_id), &["audit:read:branch"]))
        .await
        .unwrap_or_default();
    assert_eq!(options.modules, vec!["fees"]);
    assert_eq!(options.actions, vec!["fee.collected"]);

    let tenant_options = service
        .get_filter_options(&reader(tenant_id, None, &["audit:read:tenant"]))
        .await
        .unwrap_or_default();
    assert_eq!(tenant_options.modules, vec!["billing", "exams", "fees"]);
}

#[tokio::test]
async fn tenant_reader_without_tenant_scope_is_forbidden() {
    let tenant_id = TenantId::new();
    let (service, _) = service_with(Vec::new()).await;

    let result = service
        .list(
            &reader(tenant_id, None, &["audit:read:branch"]),
            AuditLogQuery::default(),
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn undecodable_stored_payload_is_masked_wholesale() {
    let tenant_id = TenantId::new();
    let mut stored = entry(tenant_id, None, "legacy", "import", at(2, 9));
    stored.changes = "password=hunter2".to_owned();
    let id = stored.id;
    let (service, _) = service_with(vec![stored]).await;

    let view = service
        .get_by_id(&reader(tenant_id, None, &["audit:read:tenant"]), id)
        .await;
    assert_eq!(
        view.map(|view| view.changes).ok(),
        Some(json!(MASK_TOKEN))
    );
}

#[test]
fn read_surface_exposes_no_mutation() {
    let sources = [
        include_str!("../audit_query_service.rs"),
        include_str!("../audit_ports/repository.rs"),
    ];
    let read_port = sources[1]
        .split("pub trait AuditRepository")
        .next()
        .unwrap_or_default();

    for forbidden in ["fn create", "fn update", "fn delete", "fn purge", "fn remove", "fn insert"] {
        assert!(!sources[0].contains(forbidden), "{forbidden}");
        assert!(!read_port.contains(forbidden), "{forbidden}");
    }
    assert!(!read_port.contains("fn append"));
}

#[test]
fn page_limits_keep_default_within_maximum() {
    let limits = AuditPageLimits::new(250, 100);
    assert_eq!(limits.as_ref().map(AuditPageLimits::default_limit).ok(), Some(100));
    assert!(AuditPageLimits::new(20, 0).is_err());
}
