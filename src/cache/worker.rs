//! Cache worker loop shared by process and serve modes.
//!
//! Pulls session ids from a [`JobSource`], analyses each session and stores
//! the rendered report. A session that fails is logged and counted; the loop
//! moves on to the next id.
//!
//! Analysis runs on the blocking pool so cancellation is observed while a
//! session is still being rendered.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::source::{JobEvent, JobSource};
use super::{CacheError, SessionId, SessionReport, SessionStore};
use crate::analysis::SessionAnalysis;
use crate::config::AnalysisConfig;

/// Counters returned when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed: u64,
    pub failed: u64,
}

pub struct CacheWorker<S: SessionStore> {
    store: Arc<S>,
    config: Arc<AnalysisConfig>,
}

impl<S: SessionStore + 'static> CacheWorker<S> {
    pub fn new(store: S, config: AnalysisConfig) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Analyse one session and store its rendered report.
    ///
    /// Nothing is stored unless every step succeeds.
    pub fn create_cache(&self, id: SessionId) -> Result<SessionReport, CacheError> {
        render_and_store(self.store.as_ref(), &self.config, id)
    }

    /// Run until the source is exhausted, fails, or `cancel` fires.
    ///
    /// Cancellation during a render stops waiting for it immediately; the
    /// detached render may still complete and store its report.
    pub async fn run<J: JobSource>(&self, source: &mut J, cancel: CancellationToken) -> WorkerStats {
        let mut stats = WorkerStats::default();
        info!(source = source.source_name(), "Cache worker started");

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
                result = source.next_job() => {
                    match result {
                        Ok(ev) => ev,
                        Err(e) => {
                            warn!(error = %e, "Job source error");
                            break;
                        }
                    }
                }
            };

            let id = match event {
                JobEvent::Session(id) => id,
                JobEvent::Eof => {
                    info!(processed = stats.processed, "Job source reached end");
                    break;
                }
            };

            info!(session_id = id, "Generating cache");
            let store = Arc::clone(&self.store);
            let config = Arc::clone(&self.config);
            let job =
                tokio::task::spawn_blocking(move || render_and_store(store.as_ref(), &config, id));

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(session_id = id, "Shutdown signal received during cache generation");
                    break;
                }
                joined = job => joined,
            };

            match outcome {
                Ok(Ok(report)) => {
                    stats.processed += 1;
                    info!(
                        session_id = id,
                        airtimes = report.airtimes.len(),
                        "Finished generating cache"
                    );
                }
                Ok(Err(e)) => {
                    stats.failed += 1;
                    error!(session_id = id, error = %e, "Cache generation failed");
                }
                Err(e) => {
                    stats.failed += 1;
                    error!(session_id = id, error = %e, "Cache generation task aborted");
                }
            }
        }

        info!(
            processed = stats.processed,
            failed = stats.failed,
            "Cache worker stopped"
        );
        stats
    }
}

fn render_and_store<S: SessionStore>(
    store: &S,
    config: &AnalysisConfig,
    id: SessionId,
) -> Result<SessionReport, CacheError> {
    let record = store.session(id)?.ok_or(CacheError::SessionNotFound(id))?;
    let setup = record.setup.ok_or(CacheError::MissingSetup(id))?;

    let analysis = SessionAnalysis::new(record.telemetry, config)?;
    let report = SessionReport::build(
        id,
        &record.description,
        setup,
        &analysis,
        config.render.lod,
    )?;

    let bytes = report.to_bytes()?;
    store.store_cache(id, &bytes)?;
    Ok(report)
}
