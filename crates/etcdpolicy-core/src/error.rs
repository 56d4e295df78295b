//! Shared error type across etcdpolicy crates.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boxed backend error carried as a `source`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stable, matchable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Configuration rejected.
    Config,
    /// Could not establish the store connection.
    Connect,
    /// TLS material malformed.
    Tls,
    /// Namespace holds no rules.
    EmptyPolicy,
    /// Stored value is not a rule record.
    Decode,
    /// Rule could not be serialized.
    Encode,
    /// Rule shape rejected (empty type, too many fields).
    InvalidRule,
    /// Filter could not be turned into a key pattern.
    Pattern,
    /// Key enumeration failed.
    RangeRead,
    /// A single store request failed.
    Store,
    /// A store request exceeded the request timeout.
    Timeout,
    /// The adapter was already closed.
    Closed,
}

impl ErrorCode {
    /// String representation used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Config => "CONFIG",
            ErrorCode::Connect => "CONNECT",
            ErrorCode::Tls => "TLS",
            ErrorCode::EmptyPolicy => "EMPTY_POLICY",
            ErrorCode::Decode => "DECODE",
            ErrorCode::Encode => "ENCODE",
            ErrorCode::InvalidRule => "INVALID_RULE",
            ErrorCode::Pattern => "PATTERN",
            ErrorCode::RangeRead => "RANGE_READ",
            ErrorCode::Store => "STORE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Closed => "CLOSED",
        }
    }
}

/// Adapter operation a store failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    Load,
    Save,
    Add,
    Remove,
    RemoveFiltered,
    Clear,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Connect => "connect",
            Phase::Load => "load",
            Phase::Save => "save",
            Phase::Add => "add",
            Phase::Remove => "remove",
            Phase::RemoveFiltered => "remove_filtered",
            Phase::Clear => "clear",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Unified error type used by core and adapter.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to connect to {endpoints}: {source}")]
    Connect {
        endpoints: String,
        #[source]
        source: BoxError,
    },

    #[error("unable to create TLS config: {0}")]
    Tls(String),

    #[error("there is no policy under {namespace}")]
    EmptyPolicy { namespace: String },

    #[error("stored value at {key} is not a policy rule: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("policy rule could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid policy rule: {0}")]
    InvalidRule(String),

    #[error("invalid filter: {0}")]
    Pattern(String),

    #[error("key enumeration under {prefix} failed: {source}")]
    RangeRead {
        prefix: String,
        #[source]
        source: BoxError,
    },

    #[error("{phase} failed: {source}")]
    Store {
        phase: Phase,
        #[source]
        source: BoxError,
    },

    #[error("{phase} request timed out after {after:?}")]
    Timeout { phase: Phase, after: Duration },

    #[error("adapter is closed")]
    Closed,
}

impl PolicyError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            PolicyError::Config(_) => ErrorCode::Config,
            PolicyError::Connect { .. } => ErrorCode::Connect,
            PolicyError::Tls(_) => ErrorCode::Tls,
            PolicyError::EmptyPolicy { .. } => ErrorCode::EmptyPolicy,
            PolicyError::Decode { .. } => ErrorCode::Decode,
            PolicyError::Encode(_) => ErrorCode::Encode,
            PolicyError::InvalidRule(_) => ErrorCode::InvalidRule,
            PolicyError::Pattern(_) => ErrorCode::Pattern,
            PolicyError::RangeRead { .. } => ErrorCode::RangeRead,
            PolicyError::Store { .. } => ErrorCode::Store,
            PolicyError::Timeout { .. } => ErrorCode::Timeout,
            PolicyError::Closed => ErrorCode::Closed,
        }
    }

    /// Phase of a store-level failure, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            PolicyError::Store { phase, .. } | PolicyError::Timeout { phase, .. } => Some(*phase),
            PolicyError::Connect { .. } => Some(Phase::Connect),
            PolicyError::RangeRead { .. } => Some(Phase::RemoveFiltered),
            _ => None,
        }
    }
}
