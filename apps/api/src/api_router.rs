use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get};
use custodia_core::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;
use crate::{handlers, middleware};

/// Methods the frontend may use cross-origin.
const CORS_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

pub fn build_router<Store>(
    app_state: AppState,
    frontend_url: &str,
    session_layer: SessionManagerLayer<Store>,
) -> Result<Router, AppError>
where
    Store: SessionStore + Clone,
{
    // Audit resources are read-only: registering GET alone makes every other
    // method answer 405.
    let audit_routes = Router::new()
        .route(
            "/api/audit/logs",
            get(handlers::audit::list_audit_logs_handler),
        )
        .route(
            "/api/audit/logs/{id}",
            get(handlers::audit::get_audit_log_handler),
        )
        .route(
            "/api/audit/filters",
            get(handlers::audit::audit_filter_options_handler),
        );

    let security_routes = Router::new()
        .route(
            "/api/security/permissions",
            get(handlers::security::permission_catalog_handler),
        )
        .route(
            "/api/security/me/permissions",
            get(handlers::security::my_permissions_handler),
        )
        .route(
            "/api/security/roles",
            get(handlers::security::list_roles_handler)
                .post(handlers::security::create_role_handler),
        )
        .route(
            "/api/security/roles/{role_id}",
            get(handlers::security::get_role_handler)
                .put(handlers::security::update_role_handler)
                .delete(handlers::security::delete_role_handler),
        )
        .route(
            "/api/security/role-assignments",
            get(handlers::security::list_role_assignments_handler)
                .post(handlers::security::assign_role_handler),
        )
        .route(
            "/api/security/role-assignments/{user_id}/{role_id}",
            delete(handlers::security::unassign_role_handler),
        );

    let protected_routes = Router::new()
        .merge(audit_routes)
        .merge(security_routes)
        .route_layer(from_fn_with_state(app_state.clone(), middleware::require_auth));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(frontend_url)?)
        .layer(session_layer)
        .with_state(app_state))
}

/// Credentialed CORS for the single trusted frontend.
fn cors_layer(frontend_url: &str) -> Result<CorsLayer, AppError> {
    let origin = HeaderValue::from_str(frontend_url)
        .map_err(|error| AppError::Validation(format!("invalid FRONTEND_URL: {error}")))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods(CORS_METHODS)
        .allow_headers([CONTENT_TYPE]))
}
