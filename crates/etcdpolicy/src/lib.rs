//! Top-level facade crate for etcdpolicy.
//!
//! Re-exports the core codec types and the adapter library so users can depend on a single crate.

pub mod core {
    pub use etcdpolicy_core::*;
}

pub mod adapter {
    pub use etcdpolicy_adapter::*;
}

pub use etcdpolicy_adapter::{MemoryModel, PolicyAdapter, PolicyModel};
pub use etcdpolicy_core::{PolicyError, PolicyRule, Result};
