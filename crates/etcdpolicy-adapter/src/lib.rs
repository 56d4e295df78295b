//! etcdpolicy adapter library entry.
//!
//! Wires config, the key-value store backends and the policy model seam
//! into [`PolicyAdapter`]. Consumed by the `etcdpolicy` binary and by
//! integration tests.

pub mod adapter;
pub mod config;
pub mod model;
pub mod store;

pub use adapter::PolicyAdapter;
pub use model::{MemoryModel, PolicyModel};
