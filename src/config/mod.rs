//! Analysis Configuration Module
//!
//! Provides the tunable detection thresholds, statistics parameters and batch
//! driver settings, loaded from TOML files.
//!
//! ## Loading Order
//!
//! 1. Explicit path (the `--config` CLI flag)
//! 2. `SST_CONFIG` environment variable (path to TOML file)
//! 3. `sst_config.toml` in the current working directory
//! 4. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! ```ignore
//! let config = AnalysisConfig::load();
//! let topouts = topouts(&travel, max_stroke, rate, &config.topout);
//! ```
//!
//! Configuration is passed by reference into every stage; there is no global.

mod analysis_config;
pub mod defaults;
pub mod validation;

pub use analysis_config::*;
