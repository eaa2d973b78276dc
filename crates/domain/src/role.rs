use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use custodia_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::permission::PermissionGrant;
use crate::resolver::PermissionSet;

/// Lifecycle class of a role. There is no transition between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Seeded by the platform; read-only after seeding.
    System,
    /// Defined by a tenant; mutable under the non-escalation rule.
    Custom,
}

impl RoleKind {
    /// Returns whether the role is seeded and immutable.
    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

/// Role code unique inside its namespace, derived from the role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleCode(String);

impl RoleCode {
    /// Derives a snake_case code from a display name.
    pub fn from_name(name: &str) -> AppResult<Self> {
        let mut code = String::with_capacity(name.len());
        for character in name.trim().chars() {
            if character.is_ascii_alphanumeric() {
                code.push(character.to_ascii_lowercase());
            } else if !code.is_empty() && !code.ends_with('_') {
                code.push('_');
            }
        }
        let code = code.trim_end_matches('_').to_owned();

        if code.is_empty() {
            return Err(AppError::Validation(format!(
                "role name '{name}' must contain at least one letter or digit"
            )));
        }

        Ok(Self(code))
    }

    /// Restores a code loaded from storage.
    #[must_use]
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the code value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for RoleCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Difference between a role's current and proposed grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantDiff {
    /// Grants present only in the proposal.
    pub added: BTreeSet<PermissionGrant>,
    /// Grants present only in the current role.
    pub removed: BTreeSet<PermissionGrant>,
}

impl GrantDiff {
    /// Computes the difference between two grant sets.
    #[must_use]
    pub fn between(
        current: &BTreeSet<PermissionGrant>,
        proposed: &BTreeSet<PermissionGrant>,
    ) -> Self {
        Self {
            added: proposed.difference(current).cloned().collect(),
            removed: current.difference(proposed).cloned().collect(),
        }
    }

    /// Returns whether nothing changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Ensures the requester holds every grant being handed out.
///
/// A principal can never grant a permission it does not itself hold. The
/// error names every unauthorized grant in code order.
pub fn ensure_grantable<'a, I>(requester: &PermissionSet, granted: I) -> AppResult<()>
where
    I: IntoIterator<Item = &'a PermissionGrant>,
{
    let missing = requester.uncovered(granted);
    if missing.is_empty() {
        return Ok(());
    }

    let codes = missing
        .into_iter()
        .map(PermissionGrant::code)
        .collect::<Vec<_>>()
        .join(", ");

    Err(AppError::InvariantViolation(format!(
        "cannot grant permissions the requester does not hold: {codes}"
    )))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::str::FromStr;

    use custodia_core::AppError;
    use proptest::prelude::*;

    use crate::permission::PermissionGrant;
    use crate::resolver::PermissionSet;

    use super::{GrantDiff, RoleCode, ensure_grantable};

    fn grants(codes: &[&str]) -> BTreeSet<PermissionGrant> {
        codes
            .iter()
            .map(|code| PermissionGrant::from_str(code).unwrap_or_else(|error| panic!("{error}")))
            .collect()
    }

    #[test]
    fn role_code_is_snake_case_of_name() {
        let code = RoleCode::from_name("  Fee Desk / Clerk ");
        assert_eq!(
            code.map(|value| value.as_str().to_owned()).unwrap_or_default(),
            "fee_desk_clerk"
        );
        assert!(RoleCode::from_name(" -- ").is_err());
    }

    #[test]
    fn escalation_names_the_unauthorized_addition() {
        let requester = PermissionSet::from_codes(["student:read:branch"])
            .unwrap_or_else(|error| panic!("{error}"));
        let requested = grants(&["student:read:branch", "student:delete:branch"]);

        let result = ensure_grantable(&requester, &requested);
        match result {
            Err(AppError::InvariantViolation(message)) => {
                assert!(message.contains("student:delete:branch"));
                assert!(!message.contains("student:read:branch"));
            }
            other => panic!("expected invariant violation, got {other:?}"),
        }
    }

    #[test]
    fn diff_separates_additions_from_removals() {
        let current = grants(&["fee:read:branch", "fee:collect:branch"]);
        let proposed = grants(&["fee:read:branch", "fee:refund:branch"]);

        let diff = GrantDiff::between(&current, &proposed);
        assert_eq!(diff.added, grants(&["fee:refund:branch"]));
        assert_eq!(diff.removed, grants(&["fee:collect:branch"]));
        assert!(GrantDiff::between(&current, &current).is_empty());
    }

    const CODES: [&str; 8] = [
        "student:read:branch",
        "student:read:tenant",
        "student:delete:branch",
        "fee:collect:own",
        "fee:collect:all",
        "fee:*",
        "exam:grade:*",
        "library:issue:branch",
    ];

    proptest! {
        #[test]
        fn grants_outside_the_held_set_always_fail(
            held_mask in 0u8..=255,
            requested_mask in 1u8..=255,
        ) {
            let pick = |mask: u8| {
                CODES
                    .iter()
                    .enumerate()
                    .filter(|(index, _)| mask & (1 << index) != 0)
                    .map(|(_, code)| *code)
                    .collect::<Vec<_>>()
            };
            let held_codes = grants(&pick(held_mask));
            let held = held_codes.iter().cloned().collect::<PermissionSet>();
            let requested = grants(&pick(requested_mask));
            let covered = requested.iter().all(|grant| held.allows_grant(grant));

            let result = ensure_grantable(&held, &requested);
            if requested.is_subset(&held_codes) {
                prop_assert!(result.is_ok());
            }
            if covered {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(matches!(result, Err(AppError::InvariantViolation(_))));
            }
        }
    }
}
