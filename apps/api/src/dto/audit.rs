use custodia_application::{AuditFilterOptions, AuditLogListing, AuditLogView, AuditPagination};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Query string accepted by the audit log listing.
///
/// Paging values stay raw so malformed numbers surface as validation errors
/// in the standard error body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQueryParams {
    pub module: Option<String>,
    pub entity: Option<String>,
    pub action: Option<String>,
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// API representation of an audit log entry with masked payloads.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/audit-log-entry-response.ts"
)]
pub struct AuditLogEntryResponse {
    pub id: String,
    pub module: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub action: String,
    pub user_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[ts(type = "unknown")]
    pub changes: Value,
    #[ts(type = "unknown")]
    pub metadata: Value,
    pub tenant_id: String,
    pub branch_id: Option<String>,
    pub created_at: String,
}

/// Pagination block of an audit listing.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/audit-pagination-response.ts"
)]
pub struct AuditPaginationResponse {
    pub page: u32,
    pub limit: u32,
    #[ts(type = "number")]
    pub total: u64,
    #[ts(type = "number")]
    pub total_pages: u64,
}

/// One page of the audit log.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/audit-log-list-response.ts"
)]
pub struct AuditLogListResponse {
    pub items: Vec<AuditLogEntryResponse>,
    pub pagination: AuditPaginationResponse,
}

/// Distinct filter values visible to the caller.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/audit-filter-options-response.ts"
)]
pub struct AuditFilterOptionsResponse {
    pub modules: Vec<String>,
    pub entities: Vec<String>,
    pub actions: Vec<String>,
}

impl From<AuditLogView> for AuditLogEntryResponse {
    fn from(value: AuditLogView) -> Self {
        Self {
            id: value.id.to_string(),
            module: value.module,
            entity: value.entity,
            entity_id: value.entity_id,
            action: value.action,
            user_id: value.user_id.to_string(),
            ip_address: value.ip_address,
            user_agent: value.user_agent,
            changes: value.changes,
            metadata: value.metadata,
            tenant_id: value.tenant_id.to_string(),
            branch_id: value.branch_id.map(|branch_id| branch_id.to_string()),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

impl From<AuditPagination> for AuditPaginationResponse {
    fn from(value: AuditPagination) -> Self {
        Self {
            page: value.page,
            limit: value.limit,
            total: value.total,
            total_pages: value.total_pages,
        }
    }
}

impl From<AuditLogListing> for AuditLogListResponse {
    fn from(value: AuditLogListing) -> Self {
        Self {
            items: value
                .items
                .into_iter()
                .map(AuditLogEntryResponse::from)
                .collect(),
            pagination: AuditPaginationResponse::from(value.pagination),
        }
    }
}

impl From<AuditFilterOptions> for AuditFilterOptionsResponse {
    fn from(value: AuditFilterOptions) -> Self {
        Self {
            modules: value.modules,
            entities: value.entities,
            actions: value.actions,
        }
    }
}
