//! Selection Actor - recomputes statistics for interactive range selection
//!
//! One actor owns one [`SessionAnalysis`]. Selection events are queued on an
//! mpsc channel and processed one at a time, so a recompute always finishes
//! before the next event for the session is looked at. Every send bumps a
//! shared generation counter: commands that are already superseded when they
//! are dequeued are skipped, and a result that finishes after a newer event
//! was issued is dropped instead of overwriting fresher output.
//!
//! Taking a generation and enqueueing the command are two steps, so clones of
//! the handle can enqueue out of order. Draining the queue keeps the command
//! with the highest generation, never just the last one received.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use super::session::{Selection, SessionAnalysis, SessionStats};

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionCommand {
    /// Restrict statistics to a time range (seconds)
    Select(Selection),
    /// Back to the whole session
    Reset,
}

impl SelectionCommand {
    fn selection(self) -> Option<Selection> {
        match self {
            SelectionCommand::Select(s) => Some(s),
            SelectionCommand::Reset => None,
        }
    }
}

/// Statistics published for a generation.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionUpdate {
    pub generation: u64,
    pub selection: Option<Selection>,
    pub stats: SessionStats,
}

// ============================================================================
// Actor Handle
// ============================================================================

/// Handle to interact with a SelectionActor
#[derive(Clone)]
pub struct SelectionHandle {
    tx: mpsc::Sender<(u64, SelectionCommand)>,
    generation: Arc<AtomicU64>,
    updates: watch::Receiver<Option<Arc<SelectionUpdate>>>,
}

impl SelectionHandle {
    /// Queue a selection; returns its generation.
    pub async fn select(&self, start_s: f64, end_s: f64) -> Result<u64> {
        self.send(SelectionCommand::Select(Selection::new(start_s, end_s)))
            .await
    }

    /// Queue a reset to the whole session; returns its generation.
    pub async fn reset(&self) -> Result<u64> {
        self.send(SelectionCommand::Reset).await
    }

    async fn send(&self, cmd: SelectionCommand) -> Result<u64> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx
            .send((generation, cmd))
            .await
            .context("Selection actor channel closed")?;
        Ok(generation)
    }

    /// Most recently published statistics.
    pub fn latest(&self) -> Option<Arc<SelectionUpdate>> {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<SelectionUpdate>>> {
        self.updates.clone()
    }

    /// Wait until statistics for `generation` (or a newer one) are published.
    pub async fn wait_for(&self, generation: u64) -> Result<Arc<SelectionUpdate>> {
        let mut rx = self.updates.clone();
        let update = rx
            .wait_for(|u| u.as_ref().is_some_and(|u| u.generation >= generation))
            .await
            .context("Selection actor stopped")?;
        update.clone().context("Selection actor published nothing")
    }
}

// ============================================================================
// Selection Actor
// ============================================================================

pub struct SelectionActor {
    analysis: SessionAnalysis,
    rx: mpsc::Receiver<(u64, SelectionCommand)>,
    generation: Arc<AtomicU64>,
    updates: watch::Sender<Option<Arc<SelectionUpdate>>>,
}

impl SelectionActor {
    /// Create new selection actor and handle
    pub fn new(analysis: SessionAnalysis) -> (Self, SelectionHandle) {
        let (tx, rx) = mpsc::channel(32);
        let (updates_tx, updates_rx) = watch::channel(None);
        let generation = Arc::new(AtomicU64::new(0));

        let actor = Self {
            analysis,
            rx,
            generation: Arc::clone(&generation),
            updates: updates_tx,
        };
        let handle = SelectionHandle {
            tx,
            generation,
            updates: updates_rx,
        };
        (actor, handle)
    }

    /// Run the actor loop until every handle is dropped.
    ///
    /// Whole-session statistics are published as generation 0 first.
    pub async fn run(mut self) {
        info!(session = %self.analysis.telemetry().name, "SelectionActor starting");
        self.recompute(0, None);

        while let Some(mut next) = self.rx.recv().await {
            // Handles may enqueue out of generation order; keep the highest
            while let Ok(queued) = self.rx.try_recv() {
                if queued.0 > next.0 {
                    next = queued;
                }
            }
            let (generation, cmd) = next;
            if generation != self.generation.load(Ordering::SeqCst) {
                debug!(generation, "Skipping superseded selection");
                continue;
            }
            self.recompute(generation, cmd.selection());
        }

        info!("SelectionActor stopped");
    }

    fn recompute(&self, generation: u64, selection: Option<Selection>) {
        let stats = match self.analysis.stats(selection) {
            Ok(stats) => stats,
            Err(e) => {
                error!(generation, error = %e, "Selection recompute failed");
                return;
            }
        };

        if generation != self.generation.load(Ordering::SeqCst) {
            debug!(generation, "Discarding stale selection result");
            return;
        }

        self.updates.send_replace(Some(Arc::new(SelectionUpdate {
            generation,
            selection,
            stats,
        })));
    }
}
