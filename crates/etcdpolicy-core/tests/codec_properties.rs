#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashSet;

use etcdpolicy_core::codec::{composite_key, StoredRule};
use etcdpolicy_core::filter::RuleFilter;
use etcdpolicy_core::key::Namespace;
use etcdpolicy_core::{PolicyRule, MAX_FIELDS};

fn sample_rules() -> Vec<PolicyRule> {
    let values = ["alice", "bob", "data1", "read", ""];
    let mut rules = Vec::new();
    for ptype in ["p", "p2", "g"] {
        for len in 0..=MAX_FIELDS {
            for (i, v) in values.iter().enumerate() {
                let fields: Vec<String> = (0..len)
                    .map(|pos| if pos == len - 1 { v.to_string() } else { values[(i + pos) % 4].to_string() })
                    .collect();
                rules.push(PolicyRule::new(ptype, fields).unwrap());
            }
        }
    }
    rules.sort();
    rules.dedup();
    rules
}

#[test]
fn distinct_rules_get_distinct_keys() {
    let rules = sample_rules();
    let keys: HashSet<String> = rules.iter().map(composite_key).collect();
    assert_eq!(keys.len(), rules.len());
}

#[test]
fn same_rule_same_key() {
    let a = PolicyRule::new("p", ["alice", "data1", "read"]).unwrap();
    let b = PolicyRule::new("p".to_string(), vec!["alice".to_string(), "data1".into(), "read".into()]).unwrap();
    assert_eq!(composite_key(&a), composite_key(&b));
}

#[test]
fn stored_value_round_trips_non_empty_fields() {
    for rule in sample_rules() {
        let stored = StoredRule::from_rule(&rule);
        let back = StoredRule::from_slice(&stored.key, &stored.to_bytes().unwrap()).unwrap();
        let expected: Vec<&str> = rule.fields().iter().map(String::as_str).filter(|f| !f.is_empty()).collect();
        let got = back.to_rule().unwrap();
        assert_eq!(got.ptype(), rule.ptype());
        assert_eq!(got.fields(), expected.as_slice(), "rule={rule:?}");
    }
}

#[test]
fn filter_matches_exactly_the_rules_it_describes() {
    let ns = Namespace::default();
    let matcher = RuleFilter::new("", 0, &["alice"]).unwrap().compile(&ns).unwrap();

    for rule in sample_rules() {
        let key = ns.entry_key(&composite_key(&rule));
        let expected = rule.slot(0) == Some("alice");
        assert_eq!(matcher.is_match(&key), expected, "key={key}");
    }
}
