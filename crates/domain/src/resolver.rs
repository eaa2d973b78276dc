//! Grant/deny decisions over a principal's held permissions.

use std::collections::BTreeSet;
use std::str::FromStr;

use custodia_core::{AppError, AppResult};

use crate::permission::{Permission, PermissionGrant};

/// The set of grants a principal holds, already parsed.
///
/// The model is purely additive: there are no deny rules, so absence of a
/// covering grant is the only way a check fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    grants: BTreeSet<PermissionGrant>,
}

impl PermissionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses stored or transport codes, rejecting any malformed entry.
    pub fn from_codes<I, S>(codes: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        codes
            .into_iter()
            .map(|code| PermissionGrant::from_str(code.as_ref()))
            .collect::<Result<BTreeSet<_>, AppError>>()
            .map(|grants| Self { grants })
    }

    /// Adds a grant.
    pub fn insert(&mut self, grant: PermissionGrant) {
        self.grants.insert(grant);
    }

    /// Adds every grant of another set.
    pub fn extend(&mut self, other: PermissionSet) {
        self.grants.extend(other.grants);
    }

    /// Iterates held grants in code order.
    pub fn iter(&self) -> impl Iterator<Item = &PermissionGrant> {
        self.grants.iter()
    }

    /// Returns the held codes in code order.
    #[must_use]
    pub fn codes(&self) -> Vec<String> {
        self.grants.iter().map(PermissionGrant::code).collect()
    }

    /// Returns whether no grant is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Returns whether the exact permission, or a broader equivalent, is held.
    #[must_use]
    pub fn allows(&self, required: &Permission) -> bool {
        self.allows_grant(&PermissionGrant::Exact(required.clone()))
    }

    /// Returns whether the grant, which may be a wildcard pattern, is held.
    #[must_use]
    pub fn allows_grant(&self, required: &PermissionGrant) -> bool {
        self.grants.iter().any(|held| held.covers(required))
    }

    /// Decides a required code. Malformed codes are denied, never raised.
    #[must_use]
    pub fn resolve(&self, required: &str) -> bool {
        PermissionGrant::from_str(required).is_ok_and(|grant| self.allows_grant(&grant))
    }

    /// Returns the requested grants this set does not cover, in code order.
    #[must_use]
    pub fn uncovered<'a, I>(&self, requested: I) -> Vec<&'a PermissionGrant>
    where
        I: IntoIterator<Item = &'a PermissionGrant>,
    {
        let mut missing = requested
            .into_iter()
            .filter(|grant| !self.allows_grant(grant))
            .collect::<Vec<_>>();
        missing.sort();
        missing.dedup();
        missing
    }
}

impl FromIterator<PermissionGrant> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = PermissionGrant>>(iter: T) -> Self {
        Self {
            grants: iter.into_iter().collect(),
        }
    }
}

/// Decides whether `held` codes grant `required`.
///
/// Malformed held codes are ignored and a malformed required code is denied;
/// this function never fails.
#[must_use]
pub fn resolve<I, S>(held: I, required: &str) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    held.into_iter()
        .filter_map(|code| PermissionGrant::from_str(code.as_ref()).ok())
        .collect::<PermissionSet>()
        .resolve(required)
}
