use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use custodia_core::{AppError, AppResult, BranchId, TenantId, UserId};
use custodia_domain::{AuditMasker, AuthorizationContext, Permission};
use serde_json::Value;
use uuid::Uuid;

use crate::audit_ports::{
    AuditFilterColumn, AuditLogEntry, AuditLogFilter, AuditLogRepository, AuditScope,
};

/// Default number of rows per page.
pub const DEFAULT_AUDIT_PAGE_SIZE: u32 = 20;

/// Default ceiling on rows per page.
pub const MAX_AUDIT_PAGE_SIZE: u32 = 100;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Page size bounds applied to every list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditPageLimits {
    default_limit: u32,
    max_limit: u32,
}

impl Default for AuditPageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_AUDIT_PAGE_SIZE,
            max_limit: MAX_AUDIT_PAGE_SIZE,
        }
    }
}

impl AuditPageLimits {
    /// Creates bounds; the default is clamped into `1..=max_limit`.
    pub fn new(default_limit: u32, max_limit: u32) -> AppResult<Self> {
        if max_limit == 0 {
            return Err(AppError::Validation(
                "audit max page size must be at least 1".to_owned(),
            ));
        }

        Ok(Self {
            default_limit: default_limit.clamp(1, max_limit),
            max_limit,
        })
    }

    /// Returns the default page size.
    #[must_use]
    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Returns the maximum page size.
    #[must_use]
    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }
}

/// Raw list parameters as received from transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuditLogQuery {
    /// Exact module filter.
    pub module: Option<String>,
    /// Exact entity filter.
    pub entity: Option<String>,
    /// Exact action filter.
    pub action: Option<String>,
    /// Acting user filter, a UUID.
    pub user_id: Option<String>,
    /// First day included, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Last day included, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// 1-based page number.
    pub page: Option<i64>,
    /// Rows per page.
    pub limit: Option<i64>,
}

/// Audit entry with sensitive payload fields masked.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogView {
    /// Entry identifier.
    pub id: Uuid,
    /// Business module.
    pub module: String,
    /// Entity type.
    pub entity: String,
    /// Affected entity identifier.
    pub entity_id: Option<String>,
    /// Stable action identifier.
    pub action: String,
    /// Acting user.
    pub user_id: UserId,
    /// Client address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Masked change payload.
    pub changes: Value,
    /// Masked metadata.
    pub metadata: Value,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning branch.
    pub branch_id: Option<BranchId>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

/// Pagination block of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditPagination {
    /// 1-based page number.
    pub page: u32,
    /// Effective page size after clamping.
    pub limit: u32,
    /// Matching rows across all pages.
    pub total: u64,
    /// Number of pages, zero when nothing matches.
    pub total_pages: u64,
}

/// One page of masked entries.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogListing {
    /// Entries newest first.
    pub items: Vec<AuditLogView>,
    /// Pagination block.
    pub pagination: AuditPagination,
}

/// Distinct filterable values in the caller's scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuditFilterOptions {
    /// Sorted modules.
    pub modules: Vec<String>,
    /// Sorted entities.
    pub entities: Vec<String>,
    /// Sorted actions.
    pub actions: Vec<String>,
}

/// Read-only access to the audit log.
///
/// Scope comes from the authorization context alone and every payload is
/// masked before it leaves the service. There is no write path here.
#[derive(Clone)]
pub struct AuditQueryService {
    repository: Arc<dyn AuditLogRepository>,
    masker: AuditMasker,
    limits: AuditPageLimits,
}

impl AuditQueryService {
    /// Creates a service with the platform masking denylist.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditLogRepository>, limits: AuditPageLimits) -> Self {
        Self {
            repository,
            masker: AuditMasker::default(),
            limits,
        }
    }

    /// Replaces the masker.
    #[must_use]
    pub fn with_masker(mut self, masker: AuditMasker) -> Self {
        self.masker = masker;
        self
    }

    /// Returns one masked entry from the caller's scope.
    ///
    /// An entry outside the scope is reported exactly like a missing one.
    pub async fn get_by_id(
        &self,
        context: &AuthorizationContext,
        id: Uuid,
    ) -> AppResult<AuditLogView> {
        let scope = self.authorize(context)?;

        self.repository
            .find_by_id(scope, id)
            .await?
            .map(|entry| self.mask(entry))
            .ok_or_else(|| AppError::NotFound(format!("audit log entry '{id}' does not exist")))
    }

    /// Returns one page of masked entries from the caller's scope.
    pub async fn list(
        &self,
        context: &AuthorizationContext,
        query: AuditLogQuery,
    ) -> AppResult<AuditLogListing> {
        let scope = self.authorize(context)?;

        let page = match query.page {
            None => 1,
            Some(value) if value >= 1 => u32::try_from(value)
                .map_err(|_| AppError::Validation(format!("page '{value}' is out of range")))?,
            Some(value) => {
                return Err(AppError::Validation(format!(
                    "page must be at least 1, got {value}"
                )));
            }
        };
        let limit = match query.limit {
            None => self.limits.default_limit,
            Some(value) if value >= 1 => {
                let max_limit = i64::from(self.limits.max_limit);
                u32::try_from(value.min(max_limit)).unwrap_or(self.limits.max_limit)
            }
            Some(value) => {
                return Err(AppError::Validation(format!(
                    "limit must be at least 1, got {value}"
                )));
            }
        };

        let created_from = parse_date(query.start_date.as_deref(), "startDate")?;
        let last_day = parse_date(query.end_date.as_deref(), "endDate")?;
        if let (Some(start), Some(end)) = (created_from, last_day)
            && start > end
        {
            return Err(AppError::Validation(format!(
                "startDate '{start}' is after endDate '{end}'"
            )));
        }
        let created_before = last_day
            .map(|day| {
                day.succ_opt().ok_or_else(|| {
                    AppError::Validation(format!("endDate '{day}' is out of range"))
                })
            })
            .transpose()?;

        let user_id = non_blank(query.user_id)
            .map(|value| value.parse::<UserId>())
            .transpose()?;

        let filter = AuditLogFilter {
            module: non_blank(query.module),
            entity: non_blank(query.entity),
            action: non_blank(query.action),
            user_id,
            created_from: created_from.map(start_of_day),
            created_before: created_before.map(start_of_day),
            limit,
            offset: u64::from(page - 1) * u64::from(limit),
        };

        let result = self.repository.find_many(scope, filter).await?;
        let total_pages = result.total.div_ceil(u64::from(limit));

        Ok(AuditLogListing {
            items: result
                .rows
                .into_iter()
                .map(|entry| self.mask(entry))
                .collect(),
            pagination: AuditPagination {
                page,
                limit,
                total: result.total,
                total_pages,
            },
        })
    }

    /// Returns the distinct module, entity and action values in scope.
    pub async fn get_filter_options(
        &self,
        context: &AuthorizationContext,
    ) -> AppResult<AuditFilterOptions> {
        let scope = self.authorize(context)?;

        Ok(AuditFilterOptions {
            modules: self
                .repository
                .distinct_values(scope, AuditFilterColumn::Module)
                .await?,
            entities: self
                .repository
                .distinct_values(scope, AuditFilterColumn::Entity)
                .await?,
            actions: self
                .repository
                .distinct_values(scope, AuditFilterColumn::Action)
                .await?,
        })
    }

    /// Checks `audit:read` at the caller's data scope and derives the scope.
    fn authorize(&self, context: &AuthorizationContext) -> AppResult<AuditScope> {
        context.require(&Permission::new("audit", "read", context.data_scope())?)?;

        Ok(AuditScope {
            tenant_id: context.tenant_id(),
            branch_id: context.branch_id(),
        })
    }

    fn mask(&self, entry: AuditLogEntry) -> AuditLogView {
        AuditLogView {
            changes: self.masker.mask_raw(&entry.changes),
            metadata: self.masker.mask_raw(&entry.metadata),
            id: entry.id,
            module: entry.module,
            entity: entry.entity,
            entity_id: entry.entity_id,
            action: entry.action,
            user_id: entry.user_id,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            tenant_id: entry.tenant_id,
            branch_id: entry.branch_id,
            created_at: entry.created_at,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_date(value: Option<&str>, label: &str) -> AppResult<Option<NaiveDate>> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(Some)
        .map_err(|_| AppError::Validation(format!("{label} '{value}' must be YYYY-MM-DD")))
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests;
