//! Permission value types and their canonical code format.
//!
//! A permission code is `resource:action:scope`, with lowercase snake_case
//! segments. Role grants may additionally use the wildcard forms
//! `resource:*` and `resource:action:*`.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use custodia_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const WILDCARD: &str = "*";

/// Breadth of data a permission applies to.
///
/// Scopes form a total order of containment: `all ⊇ tenant ⊇ branch ⊇ own`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    /// Every tenant.
    All,
    /// The caller's tenant.
    Tenant,
    /// The caller's branch inside the tenant.
    Branch,
    /// Records owned by the caller.
    Own,
}

impl PermissionScope {
    /// Every scope, broadest first.
    pub const ALL: [Self; 4] = [Self::All, Self::Tenant, Self::Branch, Self::Own];

    /// Containment rank, higher is broader.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::All => 3,
            Self::Tenant => 2,
            Self::Branch => 1,
            Self::Own => 0,
        }
    }

    /// Returns whether holding this scope implies holding `other`.
    #[must_use]
    pub const fn covers(self, other: Self) -> bool {
        self.rank() >= other.rank()
    }

    /// Returns the stable storage value for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Tenant => "tenant",
            Self::Branch => "branch",
            Self::Own => "own",
        }
    }
}

impl PartialOrd for PermissionScope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PermissionScope {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl FromStr for PermissionScope {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(Self::All),
            "tenant" => Ok(Self::Tenant),
            "branch" => Ok(Self::Branch),
            "own" => Ok(Self::Own),
            _ => Err(AppError::Validation(format!(
                "unknown permission scope '{value}'"
            ))),
        }
    }
}

impl Display for PermissionScope {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A validated resource or action identifier (`[a-z][a-z0-9_]*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeSegment(String);

impl CodeSegment {
    /// Validates a code segment.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let mut chars = value.chars();
        let starts_with_letter = chars.next().is_some_and(|first| first.is_ascii_lowercase());
        let rest_is_snake_case = chars.all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        });

        if !starts_with_letter || !rest_is_snake_case {
            return Err(AppError::Validation(format!(
                "permission segment '{value}' must be lowercase snake_case"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the segment value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for CodeSegment {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// One grantable capability: `resource:action:scope`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission {
    resource: CodeSegment,
    action: CodeSegment,
    scope: PermissionScope,
}

impl Permission {
    /// Creates a permission from validated segments.
    pub fn new(resource: &str, action: &str, scope: PermissionScope) -> AppResult<Self> {
        Ok(Self {
            resource: CodeSegment::new(resource)?,
            action: CodeSegment::new(action)?,
            scope,
        })
    }

    /// Returns the resource segment.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.resource.as_str()
    }

    /// Returns the action segment.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Returns the scope.
    #[must_use]
    pub fn scope(&self) -> PermissionScope {
        self.scope
    }

    /// Returns the same resource/action at another scope.
    #[must_use]
    pub fn with_scope(&self, scope: PermissionScope) -> Self {
        Self {
            resource: self.resource.clone(),
            action: self.action.clone(),
            scope,
        }
    }

    /// Returns the canonical `resource:action:scope` code.
    #[must_use]
    pub fn code(&self) -> String {
        self.to_string()
    }

    fn same_capability(&self, resource: &str, action: &str) -> bool {
        self.resource() == resource && self.action() == action
    }
}

impl Display for Permission {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}:{}", self.resource, self.action, self.scope)
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match PermissionGrant::from_str(value)? {
            PermissionGrant::Exact(permission) => Ok(permission),
            _ => Err(AppError::Validation(format!(
                "permission code '{value}' must not use a wildcard"
            ))),
        }
    }
}

impl TryFrom<String> for Permission {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(value.as_str())
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.code()
    }
}

/// A permission as held by a role: exact, or wildcarded by action or scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PermissionGrant {
    /// `resource:action:scope`.
    Exact(Permission),
    /// `resource:action:*`, every scope of one action.
    Action {
        /// Resource segment.
        resource: CodeSegment,
        /// Action segment.
        action: CodeSegment,
    },
    /// `resource:*`, every action and scope of a resource.
    Resource {
        /// Resource segment.
        resource: CodeSegment,
    },
}

impl PermissionGrant {
    /// Returns the resource this grant applies to.
    #[must_use]
    pub fn resource(&self) -> &str {
        match self {
            Self::Exact(permission) => permission.resource(),
            Self::Action { resource, .. } | Self::Resource { resource } => resource.as_str(),
        }
    }

    /// Returns the canonical code of this grant.
    #[must_use]
    pub fn code(&self) -> String {
        self.to_string()
    }

    /// Returns whether holding this grant implies holding `required`.
    ///
    /// Scope containment is decided by [`PermissionScope::covers`]; wildcard
    /// grants match on the non-wildcarded prefix only.
    #[must_use]
    pub fn covers(&self, required: &PermissionGrant) -> bool {
        match (self, required) {
            (Self::Resource { resource }, _) => resource.as_str() == required.resource(),
            (Self::Action { resource, action }, Self::Exact(permission)) => {
                permission.same_capability(resource.as_str(), action.as_str())
            }
            (
                Self::Action { resource, action },
                Self::Action {
                    resource: required_resource,
                    action: required_action,
                },
            ) => resource == required_resource && action == required_action,
            (Self::Action { .. }, Self::Resource { .. }) => false,
            (Self::Exact(held), Self::Exact(permission)) => {
                held.same_capability(permission.resource(), permission.action())
                    && held.scope().covers(permission.scope())
            }
            (Self::Exact(held), Self::Action { resource, action }) => {
                held.same_capability(resource.as_str(), action.as_str())
                    && held.scope() == PermissionScope::All
            }
            (Self::Exact(_), Self::Resource { .. }) => false,
        }
    }
}

impl PartialOrd for PermissionGrant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Grants sort by their canonical code.
impl Ord for PermissionGrant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code().cmp(&other.code())
    }
}

impl From<Permission> for PermissionGrant {
    fn from(value: Permission) -> Self {
        Self::Exact(value)
    }
}

impl Display for PermissionGrant {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(permission) => write!(formatter, "{permission}"),
            Self::Action { resource, action } => write!(formatter, "{resource}:{action}:*"),
            Self::Resource { resource } => write!(formatter, "{resource}:*"),
        }
    }
}

impl FromStr for PermissionGrant {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let segments = value.split(':').collect::<Vec<_>>();
        let malformed = || {
            AppError::Validation(format!(
                "permission code '{value}' must have the form resource:action:scope"
            ))
        };

        match segments.as_slice() {
            [resource, WILDCARD] => Ok(Self::Resource {
                resource: CodeSegment::new(*resource)?,
            }),
            [resource, action, WILDCARD] => Ok(Self::Action {
                resource: CodeSegment::new(*resource)?,
                action: CodeSegment::new(*action)?,
            }),
            [resource, action, scope] => Ok(Self::Exact(Permission {
                resource: CodeSegment::new(*resource)?,
                action: CodeSegment::new(*action)?,
                scope: PermissionScope::from_str(scope)?,
            })),
            _ => Err(malformed()),
        }
    }
}

impl TryFrom<String> for PermissionGrant {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(value.as_str())
    }
}

impl From<PermissionGrant> for String {
    fn from(value: PermissionGrant) -> Self {
        value.code()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{Permission, PermissionGrant, PermissionScope};

    fn grant(code: &str) -> PermissionGrant {
        PermissionGrant::from_str(code).unwrap_or_else(|error| panic!("{code}: {error}"))
    }

    #[test]
    fn permission_code_roundtrip_is_bit_exact() {
        let permission = Permission::from_str("academic_record:update:branch");
        assert!(permission.is_ok());
        assert_eq!(
            permission
                .map(|value| value.code())
                .unwrap_or_default()
                .as_str(),
            "academic_record:update:branch"
        );
    }

    #[test]
    fn malformed_codes_are_rejected() {
        for code in [
            "",
            "student",
            "student:read",
            "student:read:branch:extra",
            "student::branch",
            ":read:branch",
            "Student:read:branch",
            "student:read:region",
            "student-record:read:own",
            "*",
            "*:read:own",
        ] {
            assert!(PermissionGrant::from_str(code).is_err(), "{code} accepted");
        }
    }

    #[test]
    fn wildcard_is_not_a_plain_permission() {
        assert!(Permission::from_str("fee:*").is_err());
        assert!(Permission::from_str("fee:collect:*").is_err());
    }

    #[test]
    fn scope_order_is_explicit() {
        assert!(PermissionScope::All.covers(PermissionScope::Tenant));
        assert!(PermissionScope::Tenant.covers(PermissionScope::Own));
        assert!(PermissionScope::Branch.covers(PermissionScope::Branch));
        assert!(!PermissionScope::Branch.covers(PermissionScope::Tenant));
        assert!(!PermissionScope::Own.covers(PermissionScope::Branch));
        assert!(PermissionScope::All > PermissionScope::Own);
    }

    #[test]
    fn action_wildcard_equals_all_scope_for_that_action() {
        let all_scope = grant("fee:collect:all");
        let wildcard = grant("fee:collect:*");

        assert!(all_scope.covers(&wildcard));
        assert!(wildcard.covers(&all_scope));
        assert!(!grant("fee:collect:tenant").covers(&wildcard));
        assert!(!wildcard.covers(&grant("fee:refund:own")));
    }

    #[test]
    fn resource_wildcard_is_only_covered_by_itself() {
        assert!(grant("fee:*").covers(&grant("fee:*")));
        assert!(!grant("fee:collect:*").covers(&grant("fee:*")));
        assert!(!grant("fee:collect:all").covers(&grant("fee:*")));
        assert!(!grant("student:*").covers(&grant("fee:*")));
    }

    #[test]
    fn grants_serialize_as_codes() {
        let serialized = serde_json::to_string(&grant("library:issue:own"));
        assert_eq!(
            serialized.unwrap_or_default(),
            "\"library:issue:own\"".to_owned()
        );

        let parsed = serde_json::from_str::<PermissionGrant>("\"transport:*\"");
        assert!(parsed.is_ok());
    }
}
