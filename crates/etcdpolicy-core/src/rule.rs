//! Policy rule value type.

use crate::error::{PolicyError, Result};

/// Number of positional field slots every rule is stored with.
pub const MAX_FIELDS: usize = 6;

/// Section holding permission rules (`p`, `p2`, ...).
pub const SECTION_POLICY: &str = "p";
/// Section holding role-grouping rules (`g`, `g2`, ...).
pub const SECTION_GROUPING: &str = "g";
/// Sections persisted by a full save, in write order.
pub const SECTIONS: [&str; 2] = [SECTION_POLICY, SECTION_GROUPING];

/// One policy rule: a type tag plus up to [`MAX_FIELDS`] ordered fields.
///
/// Rules are values; a change produces a new rule (and a new key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyRule {
    ptype: String,
    fields: Vec<String>,
}

impl PolicyRule {
    /// Build a rule, rejecting an empty type or too many fields.
    pub fn new<S: Into<String>>(ptype: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Result<Self> {
        let ptype = ptype.into();
        if ptype.is_empty() {
            return Err(PolicyError::InvalidRule("policy type must not be empty".into()));
        }
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.len() > MAX_FIELDS {
            return Err(PolicyError::InvalidRule(format!(
                "{ptype} rule has {} fields, at most {MAX_FIELDS} are supported",
                fields.len()
            )));
        }
        Ok(Self { ptype, fields })
    }

    pub fn ptype(&self) -> &str {
        &self.ptype
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Value at slot `i`, `None` when the rule is shorter.
    pub fn slot(&self, i: usize) -> Option<&str> {
        self.fields.get(i).map(String::as_str)
    }

    /// All [`MAX_FIELDS`] slots in order.
    pub fn slots(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        (0..MAX_FIELDS).map(move |i| self.slot(i))
    }

    /// Section the rule type belongs to (`p2` -> `p`).
    pub fn section(&self) -> &str {
        section_of(&self.ptype)
    }
}

/// Section of a policy type: its leading character.
pub fn section_of(ptype: &str) -> &str {
    match ptype.char_indices().nth(1) {
        Some((end, _)) => &ptype[..end],
        None => ptype,
    }
}
