use std::time::Duration;

use serde::Deserialize;
use etcdpolicy_core::error::{PolicyError, Result};
use etcdpolicy_core::key::Namespace;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterConfig {
    pub version: u32,

    /// Root path of the policy set; empty means the default namespace.
    #[serde(default)]
    pub namespace: String,

    pub endpoints: Vec<String>,

    #[serde(default)]
    pub timeouts: TimeoutSection,

    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

impl AdapterConfig {
    /// Config for `endpoints` with every other setting at its default.
    pub fn new(endpoints: Vec<String>, namespace: impl Into<String>) -> Self {
        Self {
            version: 1,
            namespace: namespace.into(),
            endpoints,
            timeouts: TimeoutSection::default(),
            auth: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PolicyError::Config(format!("unsupported config version {}", self.version)));
        }
        if self.endpoints.is_empty() {
            return Err(PolicyError::Config("endpoints must not be empty".into()));
        }
        if self.endpoints.iter().any(|e| e.trim().is_empty()) {
            return Err(PolicyError::Config("endpoints must not contain blank entries".into()));
        }

        self.timeouts.validate()?;
        if let Some(auth) = &self.auth {
            auth.validate()?;
        }

        Ok(())
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(&self.namespace)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutSection {
    #[serde(default = "default_dial_ms")]
    pub dial_ms: u64,

    #[serde(default = "default_keepalive_time_ms")]
    pub keepalive_time_ms: u64,

    #[serde(default = "default_keepalive_timeout_ms")]
    pub keepalive_timeout_ms: u64,

    #[serde(default = "default_request_ms")]
    pub request_ms: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            dial_ms: default_dial_ms(),
            keepalive_time_ms: default_keepalive_time_ms(),
            keepalive_timeout_ms: default_keepalive_timeout_ms(),
            request_ms: default_request_ms(),
        }
    }
}

impl TimeoutSection {
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("dial_ms", self.dial_ms),
            ("keepalive_time_ms", self.keepalive_time_ms),
            ("keepalive_timeout_ms", self.keepalive_timeout_ms),
            ("request_ms", self.request_ms),
        ];
        for (name, ms) in all {
            if !(1..=600_000).contains(&ms) {
                return Err(PolicyError::Config(format!(
                    "timeouts.{name} must be between 1 and 600000"
                )));
            }
        }
        Ok(())
    }

    pub fn dial(&self) -> Duration {
        Duration::from_millis(self.dial_ms)
    }
    pub fn keepalive_time(&self) -> Duration {
        Duration::from_millis(self.keepalive_time_ms)
    }
    pub fn keepalive_timeout(&self) -> Duration {
        Duration::from_millis(self.keepalive_timeout_ms)
    }
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }
}

fn default_dial_ms() -> u64 {
    5000
}
fn default_keepalive_time_ms() -> u64 {
    5000
}
fn default_keepalive_timeout_ms() -> u64 {
    10000
}
fn default_request_ms() -> u64 {
    crate::adapter::DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
}

/// Connection credentials. Certificates and keys are PEM contents, not paths.
#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    #[serde(default, alias = "UseTLS")]
    pub use_tls: bool,

    /// Not used if `use_tls` is false.
    #[serde(default, alias = "CACert")]
    pub ca_cert: String,
    #[serde(default, alias = "ClientCert")]
    pub client_cert: String,
    #[serde(default, alias = "ClientKey")]
    pub client_key: String,

    /// Not used unless both username and password are set.
    #[serde(default, alias = "Username")]
    pub username: String,
    #[serde(default, alias = "Password")]
    pub password: String,
}

impl AuthConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.use_tls {
            return Ok(());
        }

        for (name, pem) in [
            ("ca_cert", &self.ca_cert),
            ("client_cert", &self.client_cert),
            ("client_key", &self.client_key),
        ] {
            if !pem.is_empty() && !looks_like_pem(pem) {
                return Err(PolicyError::Tls(format!("auth.{name} is not PEM encoded")));
            }
        }

        if self.client_cert.is_empty() != self.client_key.is_empty() {
            return Err(PolicyError::Tls(
                "auth.client_cert and auth.client_key must be given together".into(),
            ));
        }
        if self.ca_cert.is_empty() && self.client_cert.is_empty() {
            return Err(PolicyError::Tls(
                "use_tls needs a CA certificate or a client identity".into(),
            ));
        }
        Ok(())
    }

    /// `(username, password)` when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() || self.password.is_empty() {
            None
        } else {
            Some((&self.username, &self.password))
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("use_tls", &self.use_tls)
            .field("ca_cert", &!self.ca_cert.is_empty())
            .field("client_cert", &!self.client_cert.is_empty())
            .field("client_key", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn looks_like_pem(s: &str) -> bool {
    let s = s.trim();
    s.starts_with("-----BEGIN ") && s.contains("-----END ")
}
