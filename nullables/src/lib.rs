//! Nullable infrastructure for deterministic testing.
//!
//! All external dependencies of the engine (clock, fast store, catalog store)
//! are abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (advance time, take a store offline)
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod catalog;
pub mod clock;
pub mod fast_store;

pub use catalog::NullCatalogStore;
pub use clock::NullClock;
pub use fast_store::FlakyFastStore;
