use custodia_application::{RoleAssignment, RoleDefinition};
use custodia_domain::{AuthorizationContext, RegisteredPermission};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for custom role creation.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

/// Incoming payload for custom role updates. Absent fields stay unchanged.
#[derive(Debug, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-role-request.ts"
)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub expected_version: Option<i64>,
}

/// Incoming payload for role assignment.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/assign-role-request.ts"
)]
pub struct AssignRoleRequest {
    pub user_id: String,
    pub role_id: String,
    /// RFC 3339 timestamp after which the assignment stops granting.
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Query string of the role assignment listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentQuery {
    pub user_id: Option<String>,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub role_id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub permissions: Vec<String>,
    #[ts(type = "number")]
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// API representation of a role assignment.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-assignment-response.ts"
)]
pub struct RoleAssignmentResponse {
    pub user_id: String,
    pub role_id: String,
    pub role_code: String,
    pub role_name: String,
    pub assigned_by: String,
    pub assigned_at: String,
    pub expires_at: Option<String>,
}

/// API representation of a grantable permission.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-response.ts"
)]
pub struct PermissionResponse {
    pub code: String,
    pub resource: String,
    pub action: String,
    pub scope: String,
    pub description: String,
}

/// The caller's effective grants for the current request.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/effective-permissions-response.ts"
)]
pub struct EffectivePermissionsResponse {
    pub user_id: String,
    pub display_name: String,
    pub tenant_id: String,
    pub branch_id: Option<String>,
    pub permissions: Vec<String>,
}

impl From<RoleDefinition> for RoleResponse {
    fn from(role: RoleDefinition) -> Self {
        Self {
            permissions: role.permission_codes(),
            role_id: role.role_id.to_string(),
            code: role.code.to_string(),
            name: role.name,
            description: role.description,
            is_system: role.kind.is_system(),
            version: role.version,
            created_at: role.created_at.to_rfc3339(),
            updated_at: role.updated_at.to_rfc3339(),
        }
    }
}

impl From<RoleAssignment> for RoleAssignmentResponse {
    fn from(assignment: RoleAssignment) -> Self {
        Self {
            user_id: assignment.user_id.to_string(),
            role_id: assignment.role_id.to_string(),
            role_code: assignment.role_code.to_string(),
            role_name: assignment.role_name,
            assigned_by: assignment.assigned_by.to_string(),
            assigned_at: assignment.assigned_at.to_rfc3339(),
            expires_at: assignment.expires_at.map(|value| value.to_rfc3339()),
        }
    }
}

impl From<RegisteredPermission> for PermissionResponse {
    fn from(entry: RegisteredPermission) -> Self {
        Self {
            code: entry.permission.code(),
            resource: entry.permission.resource().to_owned(),
            action: entry.permission.action().to_owned(),
            scope: entry.permission.scope().as_str().to_owned(),
            description: entry.description.to_owned(),
        }
    }
}

impl EffectivePermissionsResponse {
    /// Builds the response from a resolved context.
    pub fn from_context(context: &AuthorizationContext, display_name: &str) -> Self {
        Self {
            user_id: context.user_id().to_string(),
            display_name: display_name.to_owned(),
            tenant_id: context.tenant_id().to_string(),
            branch_id: context.branch_id().map(|branch_id| branch_id.to_string()),
            permissions: context.held().codes(),
        }
    }
}
