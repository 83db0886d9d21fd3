//! Gemini Live transcription channel
//!
//! Opens one BidiGenerateContent WebSocket per practice attempt with input
//! audio transcription enabled. A dedicated worker thread owns the socket;
//! the session talks to it through a [`LiveLink`].

pub mod types;
pub mod websocket;
pub mod worker;

use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use std::time::Duration;

pub use types::{LiveEvent, LiveLink};

use super::TranscriptionChannel;
use crate::config::Credentials;
use crate::error::PracticeError;
use websocket::{connect_websocket, send_setup_message, set_socket_nonblocking, wait_for_setup};

pub struct LiveTranscriber {
    setup_timeout: Duration,
}

impl LiveTranscriber {
    pub fn new(setup_timeout: Duration) -> Self {
        Self { setup_timeout }
    }
}

impl TranscriptionChannel for LiveTranscriber {
    fn open(&self, creds: &Credentials) -> Result<LiveLink, PracticeError> {
        if !creds.is_configured() {
            return Err(PracticeError::Channel("missing API key".into()));
        }

        let mut socket = connect_websocket(&creds.api_key).map_err(PracticeError::channel)?;
        // Short reads from here on keep the setup deadline accurate.
        set_socket_nonblocking(&mut socket).map_err(PracticeError::channel)?;
        send_setup_message(&mut socket).map_err(PracticeError::channel)?;
        if let Err(e) = wait_for_setup(&mut socket, self.setup_timeout) {
            let _ = socket.close(None);
            return Err(PracticeError::channel(e));
        }
        tracing::info!("Live channel ready");

        let (chunk_tx, chunk_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let stop_signal = Arc::new(AtomicBool::new(false));

        let worker_stop = stop_signal.clone();
        let worker = std::thread::Builder::new()
            .name("live-transcription".into())
            .spawn(move || worker::run_live_worker(socket, chunk_rx, event_tx, worker_stop))
            .map_err(PracticeError::channel)?;

        Ok(LiveLink::new(chunk_tx, event_rx, stop_signal, Some(worker)))
    }
}
