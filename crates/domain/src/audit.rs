//! Audit vocabulary and read-time masking of sensitive payload fields.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// Replacement written in place of every sensitive value.
pub const MASK_TOKEN: &str = "********";

/// Key fragments that mark a field as sensitive.
///
/// Matched against the lowercase key with `_` and `-` removed.
pub const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "password",
    "passwd",
    "token",
    "secret",
    "apikey",
    "creditcard",
    "cardnumber",
    "cvv",
    "ssn",
    "otp",
    "pin",
    "privatekey",
    "authorization",
    "cookie",
];

/// Nesting depth past which a subtree is masked wholesale.
pub const MAX_MASK_DEPTH: usize = 128;

/// Actions this subsystem records about its own mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    /// Emitted when a custom role is created.
    RoleCreated,
    /// Emitted when a custom role's definition changes.
    RoleUpdated,
    /// Emitted when a custom role is deleted.
    RoleDeleted,
    /// Emitted when a role is assigned to a user.
    RoleAssigned,
    /// Emitted when a role is removed from a user.
    RoleUnassigned,
}

impl AuditAction {
    /// Module name recorded for role administration entries.
    pub const MODULE: &'static str = "security";

    /// Entity name recorded for role administration entries.
    pub const ENTITY: &'static str = "role";

    /// Returns the stored action value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleCreated => "role.created",
            Self::RoleUpdated => "role.updated",
            Self::RoleDeleted => "role.deleted",
            Self::RoleAssigned => "role.assigned",
            Self::RoleUnassigned => "role.unassigned",
        }
    }
}

/// Recursive masker over JSON payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditMasker {
    fragments: BTreeSet<String>,
}

impl Default for AuditMasker {
    fn default() -> Self {
        Self::with_fragments(SENSITIVE_KEY_FRAGMENTS.iter().copied())
    }
}

impl AuditMasker {
    /// Creates a masker with the platform denylist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a masker with a custom denylist.
    #[must_use]
    pub fn with_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fragments: fragments
                .into_iter()
                .map(|fragment| normalize_key(fragment.as_ref()))
                .filter(|fragment| !fragment.is_empty())
                .collect(),
        }
    }

    /// Returns whether a key names a sensitive field.
    #[must_use]
    pub fn is_sensitive_key(&self, key: &str) -> bool {
        let normalized = normalize_key(key);
        self.fragments
            .iter()
            .any(|fragment| normalized.contains(fragment.as_str()))
    }

    /// Returns a copy of the value with every sensitive field masked.
    #[must_use]
    pub fn mask(&self, value: Value) -> Value {
        self.mask_at(value, 0)
    }

    /// Masks a raw stored payload. Undecodable text is masked wholesale.
    #[must_use]
    pub fn mask_raw(&self, raw: &str) -> Value {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.mask(value),
            Err(_) => Value::String(MASK_TOKEN.to_owned()),
        }
    }

    fn mask_at(&self, value: Value, depth: usize) -> Value {
        match value {
            Value::Object(_) | Value::Array(_) if depth >= MAX_MASK_DEPTH => {
                Value::String(MASK_TOKEN.to_owned())
            }
            Value::Object(object) => Value::Object(
                object
                    .into_iter()
                    .map(|(key, nested)| {
                        let masked = if self.is_sensitive_key(&key) {
                            Value::String(MASK_TOKEN.to_owned())
                        } else {
                            self.mask_at(nested, depth + 1)
                        };
                        (key, masked)
                    })
                    .collect::<Map<_, _>>(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.mask_at(item, depth + 1))
                    .collect(),
            ),
            scalar => scalar,
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|character| *character != '_' && *character != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
