//! Filter matcher for partial rules.
//!
//! The store has no predicate query, so filtered removal enumerates keys and
//! tests each one against a pattern built from the partial rule. Building
//! and testing the pattern is pure and lives here.

use regex::Regex;

use crate::codec::SEPARATOR;
use crate::error::{PolicyError, Result};
use crate::key::Namespace;
use crate::rule::MAX_FIELDS;

/// Matches any single key segment. Keys always carry exactly
/// `MAX_FIELDS` separators, so an anchored `.*` cannot span two segments
/// as long as no segment starts or ends with `:`.
const WILDCARD: &str = ".*";

/// Partial rule: `None` positions are wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFilter {
    ptype: Option<String>,
    slots: [Option<String>; MAX_FIELDS],
}

impl RuleFilter {
    /// Filter matching `field_values` from `field_index` onward.
    ///
    /// An empty `ptype` matches every type; an empty value matches any
    /// field at its position. Values past the last field are accepted only
    /// when empty.
    pub fn new<S: AsRef<str>>(ptype: &str, field_index: usize, field_values: &[S]) -> Result<Self> {
        let ptype = non_empty(ptype).map(checked_segment).transpose()?;

        let mut slots: [Option<String>; MAX_FIELDS] = Default::default();
        for (offset, value) in field_values.iter().enumerate() {
            let pos = field_index.saturating_add(offset);
            let segment = non_empty(value.as_ref()).map(checked_segment).transpose()?;
            match slots.get_mut(pos) {
                Some(slot) => *slot = segment,
                None if segment.is_none() => {}
                None => {
                    return Err(PolicyError::Pattern(format!(
                        "filter value at field {pos} is past the last field, rules have {MAX_FIELDS}"
                    )))
                }
            }
        }

        Ok(Self { ptype, slots })
    }

    pub fn ptype(&self) -> Option<&str> {
        self.ptype.as_deref()
    }

    /// Narrowest range prefix that still covers every candidate key.
    pub fn range_prefix(&self, ns: &Namespace) -> String {
        match &self.ptype {
            Some(ptype) => ns.type_prefix(ptype),
            None => ns.prefix(),
        }
    }

    /// Compile into an anchored matcher over full store keys under `ns`.
    pub fn compile(&self, ns: &Namespace) -> Result<KeyMatcher> {
        let mut pattern = String::from("^");
        pattern.push_str(&regex::escape(&ns.prefix()));
        push_segment(&mut pattern, self.ptype.as_deref());
        for slot in &self.slots {
            pattern.push_str(&regex::escape(SEPARATOR));
            push_segment(&mut pattern, slot.as_deref());
        }
        pattern.push('$');

        tracing::trace!(%pattern, "compiled key filter");
        let re = Regex::new(&pattern)
            .map_err(|e| PolicyError::Pattern(format!("invalid key pattern {pattern}: {e}")))?;
        Ok(KeyMatcher { re })
    }
}

/// Compiled key pattern.
#[derive(Debug, Clone)]
pub struct KeyMatcher {
    re: Regex,
}

impl KeyMatcher {
    pub fn is_match(&self, key: &str) -> bool {
        self.re.is_match(key)
    }

    pub fn as_str(&self) -> &str {
        self.re.as_str()
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn checked_segment(s: &str) -> Result<String> {
    if s.contains(SEPARATOR) {
        return Err(PolicyError::Pattern(format!(
            "filter value {s:?} contains the key separator {SEPARATOR:?}"
        )));
    }
    if s.starts_with(':') || s.ends_with(':') {
        return Err(PolicyError::Pattern(format!(
            "filter value {s:?} starts or ends with ':' and would match across segments"
        )));
    }
    Ok(s.to_string())
}

fn push_segment(pattern: &mut String, literal: Option<&str>) {
    match literal {
        Some(v) => pattern.push_str(&regex::escape(v)),
        None => pattern.push_str(WILDCARD),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ns() -> Namespace {
        Namespace::new("casbin_policy")
    }

    #[test]
    fn offset_places_values() {
        let f = RuleFilter::new("p", 1, &["data1", "read"]).unwrap();
        let m = f.compile(&ns()).unwrap();
        assert!(m.is_match("/casbin_policy/p::alice::data1::read::_::_::_"));
        assert!(!m.is_match("/casbin_policy/p::alice::data2::read::_::_::_"));
    }

    #[test]
    fn empty_type_and_empty_value_are_wildcards() {
        let f = RuleFilter::new("", 0, &["", "data2"]).unwrap();
        assert_eq!(f.range_prefix(&ns()), "/casbin_policy/");
        let m = f.compile(&ns()).unwrap();
        assert!(m.is_match("/casbin_policy/p::bob::data2::write::_::_::_"));
        assert!(m.is_match("/casbin_policy/g::data2_admin::data2::_::_::_::_"));
    }

    #[test]
    fn values_are_literal() {
        let f = RuleFilter::new("p", 1, &["/data/*"]).unwrap();
        let m = f.compile(&ns()).unwrap();
        assert!(m.is_match("/casbin_policy/p::alice::/data/*::GET::_::_::_"));
        assert!(!m.is_match("/casbin_policy/p::alice::/data/x::GET::_::_::_"));
    }

    #[test]
    fn other_namespace_never_matches() {
        let m = RuleFilter::new("", 0, &["alice"]).unwrap().compile(&ns()).unwrap();
        assert!(!m.is_match("/casbin_policy_2/p::alice::data1::read::_::_::_"));
        assert!(!m.is_match("/other/casbin_policy/p::alice::data1::read::_::_::_"));
    }

    #[test]
    fn separator_in_value_is_rejected() {
        let err = RuleFilter::new("p", 0, &["a::b"]).unwrap_err();
        assert_eq!(err.code().as_str(), "PATTERN");
    }

    #[test]
    fn colon_edged_value_is_rejected() {
        for v in [":x", "x:", ":"] {
            let err = RuleFilter::new("p", 1, &[v]).unwrap_err();
            assert_eq!(err.code().as_str(), "PATTERN", "{v}");
        }
        assert!(RuleFilter::new("p", 1, &["a:b"]).is_ok());
    }

    #[test]
    fn plain_value_does_not_match_colon_edged_field() {
        let m = RuleFilter::new("p", 1, &["x"]).unwrap().compile(&ns()).unwrap();
        assert!(m.is_match("/casbin_policy/p::a::x::_::_::_::_"));
        assert!(!m.is_match("/casbin_policy/p::a:::x::_::_::_::_"));
    }

    #[test]
    fn filter_past_last_field_is_rejected() {
        assert!(RuleFilter::new("p", 5, &["x", "y"]).is_err());
        assert!(RuleFilter::new("p", 5, &["x"]).is_ok());
        assert!(RuleFilter::new("p", 9, &[] as &[&str]).is_ok());
    }

    #[test]
    fn empty_values_past_last_field_are_ignored() {
        let f = RuleFilter::new("p", 5, &["z", ""]).unwrap();
        let m = f.compile(&ns()).unwrap();
        assert!(m.is_match("/casbin_policy/p::a::b::c::d::e::z"));
        assert!(!m.is_match("/casbin_policy/p::a::b::c::d::e::y"));
        assert!(RuleFilter::new("p", 7, &["", ""]).is_ok());
    }
}
