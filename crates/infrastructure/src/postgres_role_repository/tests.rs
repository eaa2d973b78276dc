use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{Duration, Utc};
use custodia_application::{
    AuthorizationRepository, NewRole, NewRoleAssignment, RolePatch, RoleRepository,
};
use custodia_core::{AppError, TenantId, UserId};
use custodia_domain::{PermissionGrant, RoleCode};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PostgresRoleRepository;
use crate::PostgresAuthorizationRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const TENANT_ADMIN_ROLE_ID: Uuid = Uuid::from_u128(2);

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres role tests: {error}");
    }

    Some(pool)
}

fn grants(codes: &[&str]) -> BTreeSet<PermissionGrant> {
    codes
        .iter()
        .map(|code| PermissionGrant::from_str(code).unwrap_or_else(|error| panic!("{error}")))
        .collect()
}

fn new_role(tenant_id: TenantId, name: &str, codes: &[&str]) -> NewRole {
    NewRole {
        tenant_id,
        code: RoleCode::from_name(name).unwrap_or_else(|error| panic!("{error}")),
        name: name.to_owned(),
        description: Some("created in test".to_owned()),
        grants: grants(codes),
    }
}

#[tokio::test]
async fn system_roles_are_seeded_and_visible_to_every_tenant() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresRoleRepository::new(pool);
    let roles = repository
        .list_roles(TenantId::new())
        .await
        .unwrap_or_default();
    let codes = roles
        .iter()
        .filter(|role| role.kind.is_system())
        .map(|role| role.code.as_str().to_owned())
        .collect::<BTreeSet<_>>();

    for expected in ["super_admin", "tenant_admin", "branch_manager", "auditor"] {
        assert!(codes.contains(expected), "{expected}");
    }
}

#[tokio::test]
async fn create_update_and_delete_custom_role() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresRoleRepository::new(pool);
    let tenant_id = TenantId::new();

    let created = repository
        .create_role(new_role(tenant_id, "Fee Clerk", &["fee:collect:branch"]))
        .await;
    assert!(created.is_ok());
    let Ok(created) = created else {
        return;
    };
    assert_eq!(created.version, 1);
    assert_eq!(created.permission_codes(), vec!["fee:collect:branch"]);

    let duplicate = repository
        .create_role(new_role(tenant_id, "fee clerk", &["fee:read:branch"]))
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let patch = RolePatch {
        code: RoleCode::from_name("Fee Desk").unwrap_or_else(|error| panic!("{error}")),
        name: "Fee Desk".to_owned(),
        description: None,
        grants: grants(&["fee:read:branch", "fee:*"]),
        expected_version: created.version,
    };
    let updated = repository
        .update_role(tenant_id, created.role_id, patch.clone())
        .await;
    assert!(updated.is_ok());
    let Ok(updated) = updated else {
        return;
    };
    assert_eq!(updated.version, 2);
    assert_eq!(updated.code.as_str(), "fee_desk");
    assert_eq!(updated.permission_codes(), vec!["fee:*", "fee:read:branch"]);

    let stale = repository
        .update_role(tenant_id, created.role_id, patch)
        .await;
    assert!(matches!(stale, Err(AppError::Conflict(_))));

    let other_tenant = repository
        .find_role(TenantId::new(), created.role_id)
        .await;
    assert!(matches!(other_tenant, Ok(None)));

    assert!(repository.delete_role(tenant_id, created.role_id).await.is_ok());
    assert!(matches!(
        repository.find_role(tenant_id, created.role_id).await,
        Ok(None)
    ));
}

#[tokio::test]
async fn assigned_role_cannot_be_deleted_and_grants_flow_to_user() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresRoleRepository::new(pool.clone());
    let authorization = PostgresAuthorizationRepository::new(pool);
    let tenant_id = TenantId::new();
    let user_id = UserId::new();

    let role = repository
        .create_role(new_role(tenant_id, "Librarian", &["library:*"]))
        .await;
    assert!(role.is_ok());
    let Ok(role) = role else {
        return;
    };

    let assigned = repository
        .assign_role(
            tenant_id,
            NewRoleAssignment {
                user_id,
                role_id: role.role_id,
                assigned_by: UserId::new(),
                expires_at: None,
            },
        )
        .await;
    assert!(assigned.is_ok());

    let again = repository
        .assign_role(
            tenant_id,
            NewRoleAssignment {
                user_id,
                role_id: role.role_id,
                assigned_by: UserId::new(),
                expires_at: None,
            },
        )
        .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    let delete = repository.delete_role(tenant_id, role.role_id).await;
    assert!(matches!(delete, Err(AppError::InvariantViolation(_))));

    let codes = authorization
        .list_permission_codes_for_user(tenant_id, user_id, Utc::now())
        .await
        .unwrap_or_default();
    assert_eq!(codes, vec!["library:*".to_owned()]);

    let elsewhere = authorization
        .list_permission_codes_for_user(TenantId::new(), user_id, Utc::now())
        .await
        .unwrap_or_default();
    assert!(elsewhere.is_empty());

    assert!(
        repository
            .unassign_role(tenant_id, user_id, role.role_id)
            .await
            .is_ok()
    );
    assert!(repository.delete_role(tenant_id, role.role_id).await.is_ok());
}

#[tokio::test]
async fn expired_assignments_grant_nothing() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresRoleRepository::new(pool.clone());
    let authorization = PostgresAuthorizationRepository::new(pool);
    let tenant_id = TenantId::new();
    let user_id = UserId::new();

    let assigned = repository
        .assign_role(
            tenant_id,
            NewRoleAssignment {
                user_id,
                role_id: TENANT_ADMIN_ROLE_ID,
                assigned_by: UserId::new(),
                expires_at: Some(Utc::now() + Duration::minutes(10)),
            },
        )
        .await;
    assert!(assigned.is_ok());

    let active = authorization
        .list_permission_codes_for_user(tenant_id, user_id, Utc::now())
        .await
        .unwrap_or_default();
    assert!(active.contains(&"role:assign:tenant".to_owned()));

    let later = authorization
        .list_permission_codes_for_user(tenant_id, user_id, Utc::now() + Duration::hours(1))
        .await
        .unwrap_or_default();
    assert!(later.is_empty());

    let listed = repository
        .list_role_assignments(tenant_id, Some(user_id))
        .await
        .unwrap_or_default();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].role_code.as_str(), "tenant_admin");
}

#[tokio::test]
async fn system_roles_cannot_be_deleted_through_the_repository() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresRoleRepository::new(pool);
    let result = repository
        .delete_role(TenantId::new(), TENANT_ADMIN_ROLE_ID)
        .await;
    assert!(matches!(result, Err(AppError::InvariantViolation(_))));
}
