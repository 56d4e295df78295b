//! Adapter config loader (strict parsing).

pub mod schema;

use std::fs;

use etcdpolicy_core::error::{PolicyError, Result};

pub use schema::{AdapterConfig, AuthConfig, TimeoutSection};

pub fn load_from_file(path: &str) -> Result<AdapterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PolicyError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AdapterConfig> {
    let cfg: AdapterConfig = serde_yaml::from_str(s)
        .map_err(|e| PolicyError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
