//! JSON test vector loader shared by codec tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::fs;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TestVector {
    pub description: String,
    #[serde(default)]
    pub rule: Option<RuleData>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub expect: Option<serde_json::Value>,
    #[serde(default)]
    pub expect_error: Option<ExpectError>,
}

#[derive(Debug, Deserialize)]
pub struct RuleData {
    pub ptype: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectError {
    pub code: String,
}

pub fn load(name: &str) -> TestVector {
    let s = fs::read_to_string(format!("tests/vectors/{name}"))
        .unwrap_or_else(|e| panic!("missing vector {name}: {e}"));
    serde_json::from_str(&s).unwrap()
}
