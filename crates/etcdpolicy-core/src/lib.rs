//! etcdpolicy core: policy rule model, key addressing, codec and filter matcher.
//!
//! This crate defines how policy rules are laid out in a flat key-value
//! store and the error surface shared with the adapter. It carries no
//! transport or runtime dependencies, so everything here can be tested
//! without a live store.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed stored data surfaces as `PolicyError`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod codec;
pub mod error;
pub mod filter;
pub mod key;
pub mod rule;

/// Shared result type.
pub use error::{ErrorCode, Phase, PolicyError, Result};
pub use rule::{PolicyRule, MAX_FIELDS};
