//! Session Analysis Module
//!
//! ```text
//! LOAD:      validate -> topouts per side -> riding masks -> absent sides
//!            -> combined topouts -> airtimes -> idlings -> balance
//! SELECTION: riding mask AND time range -> histograms, bands, spectrum
//! ```
//!
//! The load stage runs once per session. The selection stage runs for every
//! range picked on the trace, either directly through
//! [`SessionAnalysis::stats`] or through a [`SelectionActor`].

mod interactive;
mod session;

pub use interactive::{SelectionActor, SelectionCommand, SelectionHandle, SelectionUpdate};
pub use session::{Selection, SessionAnalysis, SessionStats, SideAnalysis, SuspensionStats};
