//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::{LmdbCatalogStore, LmdbError};

const COUNTERS_DB: &str = "counters";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    counters_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per path per process, and
        // every handle derived from it shares this `Env`.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let counters_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some(COUNTERS_DB))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            counters_db,
        })
    }

    /// The catalog store backed by this environment.
    pub fn catalog_store(&self) -> LmdbCatalogStore {
        LmdbCatalogStore {
            env: Arc::clone(&self.env),
            counters_db: self.counters_db,
        }
    }
}
