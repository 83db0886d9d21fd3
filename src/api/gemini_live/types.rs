//! Events and the caller-side handle of a live transcription session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use crate::audio::MediaChunk;

/// Events sent from the worker to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Partial transcription of what the child said
    Fragment(String),
    /// The stream failed or was closed by the server; no more events follow
    Error(String),
}

/// Bidirectional handle: media chunks go in, [`LiveEvent`]s come out.
///
/// Events stay readable after [`LiveLink::close`], so fragments that arrived
/// just before the close can still be drained.
pub struct LiveLink {
    chunks: Option<mpsc::Sender<MediaChunk>>,
    events: mpsc::Receiver<LiveEvent>,
    stop_signal: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl LiveLink {
    pub fn new(
        chunks: mpsc::Sender<MediaChunk>,
        events: mpsc::Receiver<LiveEvent>,
        stop_signal: Arc<AtomicBool>,
        worker: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            chunks: Some(chunks),
            events,
            stop_signal,
            worker,
        }
    }

    /// A sender for the capture side. `None` once closed.
    pub fn chunk_sender(&self) -> Option<mpsc::Sender<MediaChunk>> {
        self.chunks.clone()
    }

    /// All events received so far, in arrival order. Never blocks.
    pub fn drain_events(&self) -> Vec<LiveEvent> {
        self.events.try_iter().collect()
    }

    /// Stop the worker and close the socket. Safe to call repeatedly and on
    /// a link whose worker already exited.
    pub fn close(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        self.chunks = None;
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::warn!("Live worker panicked");
            }
            tracing::info!("Live channel closed");
        }
    }
}

impl Drop for LiveLink {
    fn drop(&mut self) {
        self.close();
    }
}
