//! Store key addressing.
//!
//! Every entry lives at `/<namespace>/<composite key>`. The adapter owns the
//! whole `/<namespace>/` prefix: range reads and range deletes use it
//! unconditionally.

use crate::codec::SEPARATOR;

/// Root path used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "casbin_policy";

/// Root path under which one policy set is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace(String);

impl Namespace {
    /// Empty input (or only slashes) selects [`DEFAULT_NAMESPACE`].
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            Self(DEFAULT_NAMESPACE.to_string())
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `/<ns>`
    pub fn root(&self) -> String {
        format!("/{}", self.0)
    }

    /// `/<ns>/`, the range prefix covering every entry.
    pub fn prefix(&self) -> String {
        format!("/{}/", self.0)
    }

    /// Full store key of a composite key.
    pub fn entry_key(&self, composite: &str) -> String {
        format!("/{}/{}", self.0, composite)
    }

    /// Range prefix covering every entry of one rule type.
    pub fn type_prefix(&self, ptype: &str) -> String {
        format!("/{}/{}{}", self.0, ptype, SEPARATOR)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self(DEFAULT_NAMESPACE.to_string())
    }
}
