//! LMDB storage backend for the hotness engine.
//!
//! Implements [`CatalogStore`](hotness_store::CatalogStore) using the `heed`
//! LMDB bindings. Counters live in a single named database inside one
//! environment.

pub mod catalog;
pub mod environment;
pub mod error;

pub use catalog::LmdbCatalogStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
