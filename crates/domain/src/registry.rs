//! Static catalogue of grantable permissions.

use std::collections::{BTreeMap, BTreeSet};

use custodia_core::{AppError, AppResult};

use crate::permission::{Permission, PermissionGrant, PermissionScope};

use PermissionScope::{All, Branch, Own, Tenant};

/// Seed-time definition of one resource action and the scopes it exists at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionDefinition {
    /// Resource identifier.
    pub resource: &'static str,
    /// Action identifier.
    pub action: &'static str,
    /// Scopes the action can be granted at.
    pub scopes: &'static [PermissionScope],
    /// Human-readable description.
    pub description: &'static str,
}

const fn define(
    resource: &'static str,
    action: &'static str,
    scopes: &'static [PermissionScope],
    description: &'static str,
) -> PermissionDefinition {
    PermissionDefinition {
        resource,
        action,
        scopes,
        description,
    }
}

const EVERY_SCOPE: &[PermissionScope] = &[All, Tenant, Branch, Own];
const SHARED_SCOPES: &[PermissionScope] = &[All, Tenant, Branch];
const TENANT_SCOPES: &[PermissionScope] = &[All, Tenant];

/// Permissions shipped with the platform.
pub const STANDARD_PERMISSIONS: &[PermissionDefinition] = &[
    define("student", "create", SHARED_SCOPES, "Enrol students"),
    define("student", "read", EVERY_SCOPE, "View student profiles"),
    define("student", "update", EVERY_SCOPE, "Edit student profiles"),
    define("student", "delete", SHARED_SCOPES, "Remove students"),
    define("student", "promote", SHARED_SCOPES, "Promote students to the next class"),
    define("academic_record", "read", EVERY_SCOPE, "View academic records"),
    define("academic_record", "update", SHARED_SCOPES, "Edit academic records"),
    define("academic_record", "publish", SHARED_SCOPES, "Publish report cards"),
    define("fee", "read", EVERY_SCOPE, "View fee ledgers"),
    define("fee", "collect", SHARED_SCOPES, "Record fee payments"),
    define("fee", "refund", SHARED_SCOPES, "Refund fee payments"),
    define("fee", "waive", SHARED_SCOPES, "Grant fee waivers"),
    define("exam", "read", EVERY_SCOPE, "View exam schedules and marks"),
    define("exam", "schedule", SHARED_SCOPES, "Schedule exams"),
    define("exam", "grade", SHARED_SCOPES, "Enter exam marks"),
    define("exam", "publish_results", SHARED_SCOPES, "Publish exam results"),
    define("library", "read", EVERY_SCOPE, "Browse the library catalogue"),
    define("library", "issue", SHARED_SCOPES, "Issue books"),
    define("library", "return", SHARED_SCOPES, "Receive returned books"),
    define("library", "manage_catalog", SHARED_SCOPES, "Maintain the catalogue"),
    define("transport", "read", EVERY_SCOPE, "View routes and allocations"),
    define("transport", "manage_routes", SHARED_SCOPES, "Maintain routes and stops"),
    define("transport", "assign", SHARED_SCOPES, "Allocate students to routes"),
    define("billing", "read", TENANT_SCOPES, "View subscription invoices"),
    define("billing", "manage", TENANT_SCOPES, "Change the subscription"),
    define("audit", "read", SHARED_SCOPES, "Read the audit trail"),
    define("role", "read", TENANT_SCOPES, "View roles and assignments"),
    define("role", "create", TENANT_SCOPES, "Create custom roles"),
    define("role", "update", TENANT_SCOPES, "Edit custom roles"),
    define("role", "delete", TENANT_SCOPES, "Delete custom roles"),
    define("role", "assign", TENANT_SCOPES, "Assign roles to users"),
];

/// A registered permission with its description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredPermission {
    /// The permission value.
    pub permission: Permission,
    /// Human-readable description.
    pub description: &'static str,
}

/// Immutable, validated permission catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRegistry {
    entries: BTreeMap<Permission, &'static str>,
}

impl PermissionRegistry {
    /// Builds a registry, rejecting malformed and duplicate definitions.
    pub fn build(definitions: &[PermissionDefinition]) -> AppResult<Self> {
        let mut entries = BTreeMap::new();

        for definition in definitions {
            if definition.scopes.is_empty() {
                return Err(AppError::Validation(format!(
                    "permission '{}:{}' must declare at least one scope",
                    definition.resource, definition.action
                )));
            }

            for scope in definition.scopes {
                let permission = Permission::new(definition.resource, definition.action, *scope)?;
                if entries
                    .insert(permission.clone(), definition.description)
                    .is_some()
                {
                    return Err(AppError::Validation(format!(
                        "permission '{permission}' is defined more than once"
                    )));
                }
            }
        }

        Ok(Self { entries })
    }

    /// Builds the platform catalogue.
    pub fn standard() -> AppResult<Self> {
        Self::build(STANDARD_PERMISSIONS)
    }

    /// Returns whether the exact permission is registered.
    #[must_use]
    pub fn contains(&self, permission: &Permission) -> bool {
        self.entries.contains_key(permission)
    }

    /// Ensures a grant refers only to registered resources, actions and scopes.
    pub fn validate_grant(&self, grant: &PermissionGrant) -> AppResult<()> {
        let known = match grant {
            PermissionGrant::Exact(permission) => self.contains(permission),
            PermissionGrant::Action { resource, action } => self.entries.keys().any(|entry| {
                entry.resource() == resource.as_str() && entry.action() == action.as_str()
            }),
            PermissionGrant::Resource { resource } => self
                .entries
                .keys()
                .any(|entry| entry.resource() == resource.as_str()),
        };

        if !known {
            return Err(AppError::Validation(format!(
                "permission '{grant}' is not registered"
            )));
        }

        Ok(())
    }

    /// Parses a transport code and validates it against the catalogue.
    pub fn parse_grant(&self, code: &str) -> AppResult<PermissionGrant> {
        let grant = code.parse::<PermissionGrant>()?;
        self.validate_grant(&grant)?;
        Ok(grant)
    }

    /// Iterates registered permissions ordered by resource, action and scope.
    pub fn permissions(&self) -> impl Iterator<Item = RegisteredPermission> + '_ {
        self.entries
            .iter()
            .map(|(permission, description)| RegisteredPermission {
                permission: permission.clone(),
                description: *description,
            })
    }

    /// Returns the distinct registered resources.
    #[must_use]
    pub fn resources(&self) -> BTreeSet<&str> {
        self.entries.keys().map(Permission::resource).collect()
    }

    /// Returns the number of registered permission codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::permission::{Permission, PermissionGrant, PermissionScope};

    use super::{PermissionDefinition, PermissionRegistry, STANDARD_PERMISSIONS};

    fn standard() -> PermissionRegistry {
        PermissionRegistry::standard().unwrap_or_else(|error| panic!("{error}"))
    }

    #[test]
    fn standard_catalogue_is_valid() {
        let registry = standard();
        let expected = STANDARD_PERMISSIONS
            .iter()
            .map(|definition| definition.scopes.len())
            .sum::<usize>();
        assert_eq!(registry.len(), expected);
        assert!(registry.resources().contains("fee"));
    }

    #[test]
    fn duplicate_definitions_are_rejected_at_build_time() {
        let definitions = [
            PermissionDefinition {
                resource: "fee",
                action: "collect",
                scopes: &[PermissionScope::Branch],
                description: "first",
            },
            PermissionDefinition {
                resource: "fee",
                action: "collect",
                scopes: &[PermissionScope::Tenant, PermissionScope::Branch],
                description: "second",
            },
        ];

        assert!(PermissionRegistry::build(&definitions).is_err());
    }

    #[test]
    fn malformed_definitions_are_rejected_at_build_time() {
        let definitions = [PermissionDefinition {
            resource: "Fee",
            action: "collect",
            scopes: &[PermissionScope::Branch],
            description: "bad resource casing",
        }];
        assert!(PermissionRegistry::build(&definitions).is_err());

        let no_scopes = [PermissionDefinition {
            resource: "fee",
            action: "collect",
            scopes: &[],
            description: "no scopes",
        }];
        assert!(PermissionRegistry::build(&no_scopes).is_err());
    }

    #[test]
    fn grants_must_reference_registered_permissions() {
        let registry = standard();

        assert!(registry.parse_grant("fee:collect:branch").is_ok());
        assert!(registry.parse_grant("fee:*").is_ok());
        assert!(registry.parse_grant("exam:grade:*").is_ok());
        assert!(registry.parse_grant("billing:read:branch").is_err());
        assert!(registry.parse_grant("hostel:*").is_err());
        assert!(registry.parse_grant("fee:teleport:*").is_err());
        assert!(registry.parse_grant("fee:collect").is_err());
    }

    #[test]
    fn permissions_are_listed_in_code_order() {
        let registry = standard();
        let first = registry.permissions().next().map(|entry| entry.permission);
        assert_eq!(
            first,
            Permission::from_str("academic_record:publish:branch").ok()
        );
        assert!(
            registry
                .validate_grant(&PermissionGrant::from_str("role:assign:tenant").unwrap_or_else(
                    |error| panic!("{error}")
                ))
                .is_ok()
        );
    }
}
