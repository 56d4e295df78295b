//! Policy model seam.
//!
//! The enforcement engine owns the in-memory rules. The adapter only needs
//! to feed it policy lines on load and to read its rules per section on
//! save.

use std::collections::BTreeMap;

use etcdpolicy_core::error::{PolicyError, Result};
use etcdpolicy_core::rule::{section_of, PolicyRule};

pub trait PolicyModel: Send + Sync {
    /// Ingest one policy line, e.g. `p, alice, data1, read`.
    fn load_policy_line(&mut self, line: &str) -> Result<()>;

    /// Every rule held in `sec` (`p` or `g`), across all its types.
    fn section_rules(&self, sec: &str) -> Vec<PolicyRule>;
}

/// Minimal in-memory model: rules grouped by section, then by type, in
/// ingestion order. Re-ingesting a rule it already holds is a no-op.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryModel {
    sections: BTreeMap<String, BTreeMap<String, Vec<PolicyRule>>>,
}

impl MemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse policy text: one line per rule, blank lines and `#` comments skipped.
    pub fn from_policy_text(text: &str) -> Result<Self> {
        let mut model = Self::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            model.load_policy_line(line).map_err(|e| match e {
                PolicyError::InvalidRule(msg) => PolicyError::InvalidRule(format!("line {}: {msg}", n + 1)),
                other => other,
            })?;
        }
        Ok(model)
    }

    /// Add a rule; returns false when it was already present.
    pub fn add_rule(&mut self, rule: PolicyRule) -> bool {
        let rules = self
            .sections
            .entry(rule.section().to_string())
            .or_default()
            .entry(rule.ptype().to_string())
            .or_default();
        if rules.contains(&rule) {
            return false;
        }
        rules.push(rule);
        true
    }

    /// Rules of one type, in ingestion order.
    pub fn rules_of(&self, ptype: &str) -> &[PolicyRule] {
        self.sections
            .get(section_of(ptype))
            .and_then(|s| s.get(ptype))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every rule, all sections, as policy lines.
    pub fn lines(&self) -> Vec<String> {
        self.sections
            .values()
            .flat_map(|types| types.values())
            .flatten()
            .map(|rule| {
                std::iter::once(rule.ptype())
                    .chain(rule.fields().iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sections.values().flat_map(|s| s.values()).map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PolicyModel for MemoryModel {
    fn load_policy_line(&mut self, line: &str) -> Result<()> {
        let mut tokens = line.split(',').map(str::trim);
        let ptype = tokens.next().unwrap_or_default();
        let rule = PolicyRule::new(ptype, tokens)?;
        self.add_rule(rule);
        Ok(())
    }

    fn section_rules(&self, sec: &str) -> Vec<PolicyRule> {
        self.sections
            .get(sec)
            .map(|types| types.values().flatten().cloned().collect())
            .unwrap_or_default()
    }
}
