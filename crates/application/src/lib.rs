//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_ports;
mod audit_query_service;
mod authorization_service;
mod role_admin_service;
mod role_ports;

pub use audit_ports::{
    AuditFilterColumn, AuditLogEntry, AuditLogEntryDraft, AuditLogFilter, AuditLogPage,
    AuditLogRepository, AuditRepository, AuditScope,
};
pub use audit_query_service::{
    AuditFilterOptions, AuditLogListing, AuditLogQuery, AuditLogView, AuditPageLimits,
    AuditPagination, AuditQueryService, DEFAULT_AUDIT_PAGE_SIZE, MAX_AUDIT_PAGE_SIZE,
};
pub use authorization_service::{AuthorizationRepository, AuthorizationService};
pub use role_admin_service::RoleAdminService;
pub use role_ports::{
    CreateRoleInput, NewRole, NewRoleAssignment, RoleAssignment, RoleDefinition, RolePatch,
    RoleRepository, UpdateRoleInput,
};
