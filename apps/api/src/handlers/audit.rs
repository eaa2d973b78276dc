use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use custodia_application::AuditLogQuery;
use custodia_core::{AppError, AppResult, parse_uuid};
use custodia_domain::AuthorizationContext;

use crate::dto::{
    AuditFilterOptionsResponse, AuditLogEntryResponse, AuditLogListResponse, AuditLogQueryParams,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_audit_logs_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
    Query(params): Query<AuditLogQueryParams>,
) -> ApiResult<Json<AuditLogListResponse>> {
    let query = AuditLogQuery {
        page: parse_paging(params.page.as_deref(), "page")?,
        limit: parse_paging(params.limit.as_deref(), "limit")?,
        module: params.module,
        entity: params.entity,
        action: params.action,
        user_id: params.user_id,
        start_date: params.start_date,
        end_date: params.end_date,
    };

    let listing = state.audit_query_service.list(&context, query).await?;
    Ok(Json(AuditLogListResponse::from(listing)))
}

pub async fn get_audit_log_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<AuditLogEntryResponse>> {
    let id = parse_uuid(&id, "audit log id")?;
    let entry = state.audit_query_service.get_by_id(&context, id).await?;
    Ok(Json(AuditLogEntryResponse::from(entry)))
}

pub async fn audit_filter_options_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
) -> ApiResult<Json<AuditFilterOptionsResponse>> {
    let options = state
        .audit_query_service
        .get_filter_options(&context)
        .await?;
    Ok(Json(AuditFilterOptionsResponse::from(options)))
}

fn parse_paging(value: Option<&str>, label: &str) -> AppResult<Option<i64>> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value.parse::<i64>().map_err(|_| {
                AppError::Validation(format!("{label} '{value}' is not a valid integer"))
            })
        })
        .transpose()
}
