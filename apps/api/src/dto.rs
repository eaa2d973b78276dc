mod audit;
mod common;
mod security;

pub use audit::{
    AuditFilterOptionsResponse, AuditLogEntryResponse, AuditLogListResponse, AuditLogQueryParams,
    AuditPaginationResponse,
};
pub use common::{HealthDependencyStatus, HealthResponse};
pub use security::{
    AssignRoleRequest, CreateRoleRequest, EffectivePermissionsResponse, PermissionResponse,
    RoleAssignmentQuery, RoleAssignmentResponse, RoleResponse, UpdateRoleRequest,
};
