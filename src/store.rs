//! Durable local identity store
//!
//! Persists the visitor identity and the backend session as two JSON
//! records under fixed keys. A record that fails to parse is dropped on
//! load instead of surfacing an error.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::identity::{LocalIdentity, LocalSession};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

/// Key of the identity record
pub const IDENTITY_KEY: &str = "af_chat_client";
/// Key of the session record
pub const SESSION_KEY: &str = "af_chat_session";

/// Attempts made for a paired save before giving up
const SAVE_ATTEMPTS: u32 = 2;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Store lock poisoned")]
    Poisoned,
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A single write in an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Put { key: &'static str, value: String },
    Remove { key: &'static str },
}

/// String key-value backend
///
/// `apply` must be all-or-nothing: either every op in the batch lands or
/// none does.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn apply(&self, ops: &[StoreOp]) -> StoreResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn apply(&self, ops: &[StoreOp]) -> StoreResult<()> {
        (**self).apply(ops)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn apply(&self, ops: &[StoreOp]) -> StoreResult<()> {
        (**self).apply(ops)
    }
}

/// Records read back at activation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredRecords {
    pub identity: Option<LocalIdentity>,
    pub session: Option<LocalSession>,
}

/// Typed view over a [`KeyValueStore`]
pub struct IdentityStore<S> {
    kv: S,
}

impl<S: KeyValueStore> IdentityStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn inner(&self) -> &S {
        &self.kv
    }

    /// Read both records; each one is independently discarded if corrupt
    pub fn load(&self) -> StoredRecords {
        let identity = self
            .read_record::<LocalIdentity>(IDENTITY_KEY)
            .filter(|identity| {
                let complete = identity.is_complete();
                if !complete {
                    tracing::warn!(key = IDENTITY_KEY, "Stored identity incomplete, discarding");
                    self.discard(IDENTITY_KEY);
                }
                complete
            });
        let session = self.read_record::<LocalSession>(SESSION_KEY);

        if let Some(identity) = &identity {
            tracing::info!(first_name = %identity.first_name, "Returning visitor recognized");
        }

        StoredRecords { identity, session }
    }

    /// Write identity and session as one unit
    pub fn save(&self, identity: &LocalIdentity, session: &LocalSession) -> StoreResult<()> {
        let ops = [
            StoreOp::Put {
                key: IDENTITY_KEY,
                value: serde_json::to_string(identity)?,
            },
            StoreOp::Put {
                key: SESSION_KEY,
                value: serde_json::to_string(session)?,
            },
        ];

        let mut attempt = 1;
        loop {
            match self.kv.apply(&ops) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < SAVE_ATTEMPTS => {
                    tracing::warn!(error = %e, attempt, "Paired identity save failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Remove both records
    pub fn clear(&self) -> StoreResult<()> {
        self.kv.apply(&[
            StoreOp::Remove { key: IDENTITY_KEY },
            StoreOp::Remove { key: SESSION_KEY },
        ])
    }

    fn read_record<T: DeserializeOwned>(&self, key: &'static str) -> Option<T> {
        let raw = match self.kv.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read stored record");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored record is corrupt, discarding");
                self.discard(key);
                None
            }
        }
    }

    fn discard(&self, key: &'static str) {
        if let Err(e) = self.kv.apply(&[StoreOp::Remove { key }]) {
            tracing::warn!(key, error = %e, "Failed to remove discarded record");
        }
    }
}
