//! Job source abstraction for cache generation.
//!
//! Provides a unified trait for obtaining session ids to render:
//! a single id (process mode), an in-memory list, and a TCP queue
//! (serve mode) where producers push little-endian i32 ids.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use super::SessionId;

/// Events produced by a job source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    /// Render the cache of this session.
    Session(SessionId),
    /// No more jobs will arrive.
    Eof,
}

/// Trait abstracting where session ids come from.
///
/// The worker loop calls [`next_job`](JobSource::next_job) in a select! with
/// cancellation.
#[async_trait]
pub trait JobSource: Send + 'static {
    /// Returns `Err` on unrecoverable errors only.
    async fn next_job(&mut self) -> Result<JobEvent>;

    /// Human-readable name for logging
    fn source_name(&self) -> &str;
}

// ============================================================================
// Single Session (process mode)
// ============================================================================

pub struct SingleSession {
    id: Option<SessionId>,
}

impl SingleSession {
    pub fn new(id: SessionId) -> Self {
        Self { id: Some(id) }
    }
}

#[async_trait]
impl JobSource for SingleSession {
    async fn next_job(&mut self) -> Result<JobEvent> {
        Ok(self.id.take().map_or(JobEvent::Eof, JobEvent::Session))
    }

    fn source_name(&self) -> &str {
        "single"
    }
}

// ============================================================================
// Queued Sessions (in-memory list)
// ============================================================================

pub struct QueuedSessions {
    ids: std::vec::IntoIter<SessionId>,
}

impl QueuedSessions {
    pub fn new(ids: Vec<SessionId>) -> Self {
        Self {
            ids: ids.into_iter(),
        }
    }
}

#[async_trait]
impl JobSource for QueuedSessions {
    async fn next_job(&mut self) -> Result<JobEvent> {
        Ok(self.ids.next().map_or(JobEvent::Eof, JobEvent::Session))
    }

    fn source_name(&self) -> &str {
        "queue"
    }
}

// ============================================================================
// TCP Source (serve mode)
// ============================================================================

/// Accepts producers on a listening socket, one connection at a time.
///
/// Each message is a 4-byte little-endian session id. A producer that
/// disconnects (or sends a truncated id) is dropped and the next one is
/// accepted, so this source never reports EOF.
pub struct TcpJobSource {
    listener: TcpListener,
    conn: Option<(TcpStream, SocketAddr)>,
}

impl TcpJobSource {
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind job queue on {addr}"))?;
        info!(addr = %listener.local_addr()?, "Listening for session ids");
        Ok(Self {
            listener,
            conn: None,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

#[async_trait]
impl JobSource for TcpJobSource {
    async fn next_job(&mut self) -> Result<JobEvent> {
        loop {
            if self.conn.is_none() {
                let (stream, peer) = self
                    .listener
                    .accept()
                    .await
                    .context("Job queue accept failed")?;
                info!(%peer, "Producer connected");
                self.conn = Some((stream, peer));
            }
            let Some((stream, peer)) = self.conn.as_mut() else {
                continue;
            };
            let peer = *peer;

            let mut buf = [0u8; 4];
            match stream.read_exact(&mut buf).await {
                Ok(_) => return Ok(JobEvent::Session(SessionId::from_le_bytes(buf))),
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    info!(%peer, "Producer disconnected");
                }
                Err(e) => {
                    warn!(%peer, error = %e, "Producer connection failed");
                }
            }
            self.conn = None;
        }
    }

    fn source_name(&self) -> &str {
        "tcp"
    }
}
