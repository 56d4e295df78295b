//! Rule codec vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use etcdpolicy_core::codec::{composite_key, StoredRule};
use etcdpolicy_core::PolicyRule;

mod vector_loader;
use vector_loader::load;

#[test]
fn rule_vectors() {
    let files = [
        "rule_permission.json",
        "rule_grouping.json",
        "rule_full.json",
        "rule_no_fields.json",
    ];

    for f in files {
        let v = load(f);
        let data = v.rule.expect("rule vector without rule block");
        let ex = v.expect.expect("missing expect block");
        let rule = PolicyRule::new(data.ptype.as_str(), data.fields.iter().map(String::as_str)).unwrap();

        assert_eq!(composite_key(&rule), ex["key"].as_str().unwrap(), "vector={}", v.description);

        let stored = StoredRule::from_rule(&rule);
        assert_eq!(stored.key, ex["key"].as_str().unwrap(), "vector={}", v.description);

        let bytes = stored.to_bytes().unwrap();
        if let Some(value) = ex.get("value").and_then(|v| v.as_str()) {
            assert_eq!(String::from_utf8(bytes.clone()).unwrap(), value, "vector={}", v.description);
        }

        let decoded = StoredRule::from_slice(&stored.key, &bytes).unwrap();
        assert_eq!(decoded, stored, "vector={}", v.description);
        assert_eq!(decoded.to_line(), ex["line"].as_str().unwrap(), "vector={}", v.description);
        assert_eq!(decoded.to_rule().unwrap(), rule, "vector={}", v.description);
    }
}

#[test]
fn value_vectors() {
    let files = [
        "value_sparse.json",
        "value_inner_gap.json",
        "value_not_json.json",
        "value_wrong_shape.json",
        "value_empty_object.json",
        "value_array.json",
    ];

    for f in files {
        let v = load(f);
        let raw = v.value.expect("value vector without value");
        let res = StoredRule::from_slice("/casbin_policy/vector", raw.as_bytes());

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.code().as_str(), err.code, "vector={}", v.description);
            assert!(e.to_string().contains("/casbin_policy/vector"), "vector={}", v.description);
            continue;
        }

        let stored = res.expect("expected ok value");
        let ex = v.expect.expect("missing expect block");
        assert_eq!(stored.to_line(), ex["line"].as_str().unwrap(), "vector={}", v.description);

        let fields: Vec<&str> = ex["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f.as_str().unwrap())
            .collect();
        let rule = stored.to_rule().unwrap();
        assert_eq!(rule.fields(), fields.as_slice(), "vector={}", v.description);
    }
}
