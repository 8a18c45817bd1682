//! SST Analysis: suspension telemetry feature extraction
//!
//! Turns recorded fork and shock travel into the features a rider tunes with.
//!
//! ## Architecture
//!
//! - **Types**: telemetry record, sample intervals, boolean masks
//! - **Detection**: topouts, combined topouts, airtimes, idlings
//! - **Processing**: histograms, travel spectrum, velocity bands, balance
//! - **Analysis**: per-session orchestration and interactive selection
//! - **Cache**: batch generation of rendered session reports

pub mod analysis;
pub mod cache;
pub mod config;
pub mod detection;
pub mod processing;
pub mod types;

// Re-export configuration
pub use config::{AnalysisConfig, ConfigError};

// Re-export commonly used types
pub use types::{intervals_mask, Interval, Mask, Side, Suspension, Telemetry, TelemetryError};

// Re-export analysis entry points
pub use analysis::{Selection, SelectionActor, SelectionHandle, SessionAnalysis, SessionStats};

// Re-export batch components
pub use cache::{CacheError, CacheWorker, JobSource, SessionStore, SledStore, StorageError};
