//! Batch cache generation
//!
//! ```text
//! JobSource (single id | list | TCP queue)
//!     -> SessionStore::session -> SessionAnalysis -> SessionReport
//!     -> SessionStore::store_cache
//! ```
//!
//! A failure while rendering one session never stops the worker loop.

mod report;
mod source;
mod store;
mod worker;

pub use report::*;
pub use source::*;
pub use store::*;
pub use worker::*;

use thiserror::Error;

use crate::processing::ProcessingError;
use crate::types::TelemetryError;

/// Why a single session could not be cached.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("No such session: {0}")]
    SessionNotFound(SessionId),

    #[error("Missing setup data for session {0}")]
    MissingSetup(SessionId),

    #[error("Invalid telemetry: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Processing failed: {0}")]
    Processing(#[from] ProcessingError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
