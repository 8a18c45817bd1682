//! Session Storage Module
//!
//! Sessions and their rendered caches live in one sled database, in two trees:
//!
//! - `sessions`: JSON [`SessionRecord`] (name, description, setup, telemetry)
//! - `cache`: rendered report bytes
//!
//! Key: session id as i32 big-endian bytes

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::types::Telemetry;

pub type SessionId = i32;

const SESSIONS_TREE: &str = "sessions";
const CACHE_TREE: &str = "cache";

/// Error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Sensor calibration shown alongside a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSetup {
    pub name: String,
    /// mm
    pub arm_length: f64,
    /// mm
    pub max_distance: f64,
    /// mm
    pub max_stroke: f64,
}

/// Bike setup a session was recorded with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupInfo {
    pub name: String,
    pub linkage: String,
    pub front: CalibrationSetup,
    pub rear: CalibrationSetup,
}

/// Everything stored for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Sessions can be uploaded before a setup is attached
    #[serde(default)]
    pub setup: Option<SetupInfo>,
    pub telemetry: Telemetry,
}

/// Where the cache worker reads sessions from and writes rendered caches to.
pub trait SessionStore: Send + Sync {
    fn session(&self, id: SessionId) -> Result<Option<SessionRecord>, StorageError>;

    fn put_session(&self, id: SessionId, record: &SessionRecord) -> Result<(), StorageError>;

    fn store_cache(&self, id: SessionId, bytes: &[u8]) -> Result<(), StorageError>;

    fn cache(&self, id: SessionId) -> Result<Option<Vec<u8>>, StorageError>;
}

/// sled-backed session store
#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
    sessions: sled::Tree,
    cache: sled::Tree,
}

impl SledStore {
    /// Open or create the database at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        let sessions = db.open_tree(SESSIONS_TREE)?;
        let cache = db.open_tree(CACHE_TREE)?;
        Ok(Self {
            db: Arc::new(db),
            sessions,
            cache,
        })
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Get database size in bytes
    pub fn size_bytes(&self) -> u64 {
        self.db.size_on_disk().unwrap_or(0)
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl SessionStore for SledStore {
    fn session(&self, id: SessionId) -> Result<Option<SessionRecord>, StorageError> {
        self.sessions
            .get(id.to_be_bytes())?
            .map(|value| serde_json::from_slice(&value))
            .transpose()
            .map_err(StorageError::from)
    }

    fn put_session(&self, id: SessionId, record: &SessionRecord) -> Result<(), StorageError> {
        let value = serde_json::to_vec(record)?;
        self.sessions.insert(id.to_be_bytes(), value)?;
        Ok(())
    }

    fn store_cache(&self, id: SessionId, bytes: &[u8]) -> Result<(), StorageError> {
        self.cache.insert(id.to_be_bytes(), bytes)?;
        Ok(())
    }

    fn cache(&self, id: SessionId) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.cache.get(id.to_be_bytes())?.map(|v| v.to_vec()))
    }
}
