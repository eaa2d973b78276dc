use std::sync::Arc;

use custodia_application::{AuditQueryService, AuthorizationService, RoleAdminService};
use custodia_core::AppError;
use custodia_domain::PermissionRegistry;
use custodia_infrastructure::{
    PostgresAuditLogRepository, PostgresAuditRepository, PostgresAuthorizationRepository,
    PostgresRoleRepository,
};
use sqlx::PgPool;

use crate::api_config::ApiConfig;
use crate::state::AppState;

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> Result<AppState, AppError> {
    let registry = Arc::new(PermissionRegistry::standard()?);

    let authorization_service = AuthorizationService::new(Arc::new(
        PostgresAuthorizationRepository::new(pool.clone()),
    ));
    let role_admin_service = RoleAdminService::new(
        registry,
        Arc::new(PostgresRoleRepository::new(pool.clone())),
        Arc::new(PostgresAuditRepository::new(pool.clone())),
    );
    let audit_query_service = AuditQueryService::new(
        Arc::new(PostgresAuditLogRepository::new(pool.clone())),
        config.audit_page_limits,
    );

    Ok(AppState {
        authorization_service,
        role_admin_service,
        audit_query_service,
        postgres_pool: Some(pool),
        frontend_url: config.frontend_url.clone(),
    })
}
