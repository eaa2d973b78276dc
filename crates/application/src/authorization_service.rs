use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use custodia_core::{AppResult, TenantId, UserId, UserIdentity};
use custodia_domain::{AuthorizationContext, Permission, PermissionGrant, PermissionSet};

/// Repository port for permission lookups.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Lists the stored grant codes of every role assigned to the user in
    /// the tenant whose assignment is still active at `now`.
    async fn list_permission_codes_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<String>>;
}

/// Application service resolving effective permissions.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationRepository>) -> Self {
        Self { repository }
    }

    /// Returns the union of grants of the user's active role assignments.
    ///
    /// Computed fresh on every call; a revoked or expired assignment stops
    /// granting on the next request. Stored codes that no longer parse are
    /// skipped rather than failing the request.
    pub async fn compute_effective_permissions(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> AppResult<PermissionSet> {
        let codes = self
            .repository
            .list_permission_codes_for_user(tenant_id, user_id, Utc::now())
            .await?;

        Ok(codes
            .iter()
            .filter_map(|code| PermissionGrant::from_str(code).ok())
            .collect())
    }

    /// Builds the request-scoped context for an authenticated identity.
    pub async fn authorization_context(
        &self,
        identity: &UserIdentity,
    ) -> AppResult<AuthorizationContext> {
        let held = self
            .compute_effective_permissions(identity.tenant_id(), identity.user_id())
            .await?;

        Ok(AuthorizationContext::new(
            identity.tenant_id(),
            identity.branch_id(),
            identity.user_id(),
            held,
        ))
    }

    /// Ensures the context holds the required permission.
    pub fn require_permission(
        &self,
        context: &AuthorizationContext,
        permission: &Permission,
    ) -> AppResult<()> {
        context.require(permission)
    }
}
