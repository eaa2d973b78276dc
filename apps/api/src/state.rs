use custodia_application::{AuditQueryService, AuthorizationService, RoleAdminService};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authorization_service: AuthorizationService,
    pub role_admin_service: RoleAdminService,
    pub audit_query_service: AuditQueryService,
    /// Absent when the services run on in-memory adapters.
    pub postgres_pool: Option<PgPool>,
    pub frontend_url: String,
}
