//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_log_repository;
mod in_memory_role_repository;
mod postgres_audit_log_repository;
mod postgres_audit_repository;
mod postgres_authorization_repository;
mod postgres_role_repository;

pub use in_memory_audit_log_repository::InMemoryAuditLogRepository;
pub use in_memory_role_repository::InMemoryRoleRepository;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_role_repository::PostgresRoleRepository;
