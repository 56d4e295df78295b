//! Rule codec: composite keys and stored values.
//!
//! A rule is addressed by its composite key, `ptype` followed by all
//! [`MAX_FIELDS`] slots joined with [`SEPARATOR`], absent slots written as
//! [`PLACEHOLDER`]. The stored value is a JSON record carrying the same key,
//! the type and the six slots (absent slots as `""`).
//!
//! Keys are unambiguous only while field values do not contain
//! [`SEPARATOR`], do not start or end with `:`, and do not equal
//! [`PLACEHOLDER`]. None of this is checked on write: `p, a, :x` and
//! `p, a:, x` share the key `p::a:::x::_::_::_::_`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PolicyError, Result};
use crate::rule::{PolicyRule, MAX_FIELDS};

/// Joins the segments of a composite key.
pub const SEPARATOR: &str = "::";
/// Stands in for an absent field slot inside a composite key.
pub const PLACEHOLDER: &str = "_";
/// Joins the tokens of a policy line.
pub const LINE_SEPARATOR: &str = ", ";

/// Composite key of a rule: `ptype::v0::v1::v2::v3::v4::v5`.
pub fn composite_key(rule: &PolicyRule) -> String {
    let mut key = String::from(rule.ptype());
    for slot in rule.slots() {
        key.push_str(SEPARATOR);
        key.push_str(slot.unwrap_or(PLACEHOLDER));
    }
    key
}

/// Stored value record. Field names are the on-disk format.
///
/// Only `ptype` is required; older writers left out `key` and trailing slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRule {
    #[serde(default)]
    pub key: String,
    #[serde(deserialize_with = "non_empty_ptype")]
    pub ptype: String,
    #[serde(default)]
    pub v0: String,
    #[serde(default)]
    pub v1: String,
    #[serde(default)]
    pub v2: String,
    #[serde(default)]
    pub v3: String,
    #[serde(default)]
    pub v4: String,
    #[serde(default)]
    pub v5: String,
}

fn non_empty_ptype<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    let ptype = String::deserialize(d)?;
    if ptype.is_empty() {
        return Err(serde::de::Error::custom("ptype must not be empty"));
    }
    Ok(ptype)
}

impl StoredRule {
    pub fn from_rule(rule: &PolicyRule) -> Self {
        let mut stored = StoredRule {
            key: composite_key(rule),
            ptype: rule.ptype().to_string(),
            ..Default::default()
        };
        for (dst, src) in stored.slots_mut().into_iter().zip(rule.fields()) {
            dst.clone_from(src);
        }
        stored
    }

    /// Parse a stored value; `key` only feeds the error context.
    pub fn from_slice(key: &str, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| PolicyError::Decode {
            key: key.to_string(),
            source,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(PolicyError::Encode)
    }

    pub fn slots(&self) -> [&str; MAX_FIELDS] {
        [
            self.v0.as_str(),
            self.v1.as_str(),
            self.v2.as_str(),
            self.v3.as_str(),
            self.v4.as_str(),
            self.v5.as_str(),
        ]
    }

    fn slots_mut(&mut self) -> [&mut String; MAX_FIELDS] {
        [
            &mut self.v0,
            &mut self.v1,
            &mut self.v2,
            &mut self.v3,
            &mut self.v4,
            &mut self.v5,
        ]
    }

    /// Policy line for model ingestion: the type, then every non-empty slot.
    ///
    /// Empty slots are left out entirely rather than rendered as empty tokens.
    pub fn to_line(&self) -> String {
        let mut line = self.ptype.clone();
        for v in self.slots().into_iter().filter(|v| !v.is_empty()) {
            line.push_str(LINE_SEPARATOR);
            line.push_str(v);
        }
        line
    }

    /// The rule denoted by [`StoredRule::to_line`].
    pub fn to_rule(&self) -> Result<PolicyRule> {
        PolicyRule::new(
            self.ptype.as_str(),
            self.slots().into_iter().filter(|v| !v.is_empty()),
        )
    }
}
