use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use custodia_application::{AuditPageLimits, DEFAULT_AUDIT_PAGE_SIZE, MAX_AUDIT_PAGE_SIZE};
use custodia_core::AppError;
use tracing_subscriber::EnvFilter;

/// Upper bound accepted for `AUDIT_MAX_PAGE_SIZE`.
const AUDIT_PAGE_SIZE_CEILING: u32 = 1_000;

/// Settings shared with the sign-in service that owns the sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub table_name: String,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub idle_timeout_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub session: SessionConfig,
    pub audit_page_limits: AuditPageLimits,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let session = SessionConfig {
            table_name: env::var("SESSION_TABLE").unwrap_or_else(|_| "tower_sessions".to_owned()),
            cookie_name: env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "id".to_owned()),
            cookie_secure: env::var("SESSION_COOKIE_SECURE")
                .unwrap_or_else(|_| "false".to_owned())
                .eq_ignore_ascii_case("true"),
            idle_timeout_minutes: optional_u32_env("SESSION_IDLE_TIMEOUT_MINUTES")?
                .map_or(30, i64::from),
        };

        let max_page_size = optional_u32_env("AUDIT_MAX_PAGE_SIZE")?.unwrap_or(MAX_AUDIT_PAGE_SIZE);
        if !(1..=AUDIT_PAGE_SIZE_CEILING).contains(&max_page_size) {
            return Err(AppError::Validation(format!(
                "AUDIT_MAX_PAGE_SIZE must be between 1 and {AUDIT_PAGE_SIZE_CEILING}, got {max_page_size}"
            )));
        }
        let default_page_size =
            optional_u32_env("AUDIT_DEFAULT_PAGE_SIZE")?.unwrap_or(DEFAULT_AUDIT_PAGE_SIZE);
        let audit_page_limits = AuditPageLimits::new(default_page_size, max_page_size)?;

        Ok(Self {
            migrate_only,
            database_url,
            frontend_url,
            api_host,
            api_port,
            session,
            audit_page_limits,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    let value = env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn optional_u32_env(name: &str) -> Result<Option<u32>, AppError> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            value
                .trim()
                .parse::<u32>()
                .map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))
        })
        .transpose()
}
