//! Permission model, roles, authorization context and audit masking.

#![forbid(unsafe_code)]

mod audit;
mod context;
mod permission;
mod registry;
mod resolver;
mod role;

pub use audit::{AuditAction, AuditMasker, MASK_TOKEN, MAX_MASK_DEPTH, SENSITIVE_KEY_FRAGMENTS};
pub use context::AuthorizationContext;
pub use permission::{CodeSegment, Permission, PermissionGrant, PermissionScope};
pub use registry::{
    PermissionDefinition, PermissionRegistry, RegisteredPermission, STANDARD_PERMISSIONS,
};
pub use resolver::{PermissionSet, resolve};
pub use role::{GrantDiff, RoleCode, RoleKind, ensure_grantable};
