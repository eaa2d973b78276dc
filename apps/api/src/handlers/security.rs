use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use custodia_core::{AppError, AppResult, UserId, UserIdentity, parse_uuid};
use custodia_domain::AuthorizationContext;

use crate::dto::{
    AssignRoleRequest, CreateRoleRequest, EffectivePermissionsResponse, PermissionResponse,
    RoleAssignmentQuery, RoleAssignmentResponse, RoleResponse, UpdateRoleRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod assignments;
mod permissions;
mod roles;

pub use assignments::{
    assign_role_handler, list_role_assignments_handler, unassign_role_handler,
};
pub use permissions::{my_permissions_handler, permission_catalog_handler};
pub use roles::{
    create_role_handler, delete_role_handler, get_role_handler, list_roles_handler,
    update_role_handler,
};

fn parse_role_id(value: &str) -> AppResult<uuid::Uuid> {
    parse_uuid(value, "role id")
}

fn parse_expiry(value: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            DateTime::parse_from_rfc3339(value)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|_| {
                    AppError::Validation(format!("expiresAt '{value}' is not an RFC 3339 timestamp"))
                })
        })
        .transpose()
}
