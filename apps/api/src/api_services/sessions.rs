use custodia_core::AppError;
use sqlx::PgPool;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::api_config::SessionConfig;

/// Reads sessions written by the sign-in service.
///
/// Both services must agree on the table and the cookie name, so neither is
/// derived locally.
pub async fn build_postgres_session_layer(
    pool: PgPool,
    config: &SessionConfig,
) -> Result<SessionManagerLayer<PostgresStore>, AppError> {
    let store = PostgresStore::new(pool)
        .with_table_name(config.table_name.as_str())
        .map_err(|error| {
            AppError::Validation(format!(
                "invalid SESSION_TABLE '{}': {error}",
                config.table_name
            ))
        })?;
    store
        .migrate()
        .await
        .map_err(|error| AppError::Internal(format!("failed to prepare session table: {error}")))?;

    Ok(SessionManagerLayer::new(store)
        .with_name(config.cookie_name.clone())
        .with_secure(config.cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(
            config.idle_timeout_minutes,
        ))))
}
