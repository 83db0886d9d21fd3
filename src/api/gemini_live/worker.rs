//! Worker thread for one live transcription session

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use tungstenite::Message;

use super::types::LiveEvent;
use super::websocket::{
    is_timeout, parse_error, parse_input_transcription, send_media_chunk, LiveSocket,
};
use crate::audio::MediaChunk;

/// Pump captured chunks up and transcription fragments down until stopped
/// or the stream fails.
pub fn run_live_worker(
    mut socket: LiveSocket,
    chunks: mpsc::Receiver<MediaChunk>,
    events: mpsc::Sender<LiveEvent>,
    stop_signal: Arc<AtomicBool>,
) {
    let mut sent_chunks: u64 = 0;
    let mut fragments: u64 = 0;

    'session: loop {
        if stop_signal.load(Ordering::SeqCst) {
            break;
        }

        match drain_chunks(&chunks, &mut sent_chunks, |chunk| {
            send_media_chunk(&mut socket, chunk)
        }) {
            Ok(ChunkFeed::Open) => {}
            Ok(ChunkFeed::Closed) => {
                tracing::debug!("Chunk sender dropped, ending live session");
                break 'session;
            }
            Err(e) => {
                report(&events, &stop_signal, format!("Send failed: {}", e));
                break 'session;
            }
        }

        match socket.read() {
            Ok(Message::Text(msg)) => {
                if !handle_server_message(msg.as_str(), &events, &mut fragments) {
                    break;
                }
            }
            Ok(Message::Binary(data)) => {
                if let Ok(text) = std::str::from_utf8(&data) {
                    if !handle_server_message(text, &events, &mut fragments) {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                report(&events, &stop_signal, "Connection closed by server".to_string());
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e)) if is_timeout(e) => {}
            Err(e) => {
                report(&events, &stop_signal, format!("Read error: {}", e));
                break;
            }
        }
    }

    let _ = socket.close(None);
    let _ = socket.flush();
    tracing::debug!(sent_chunks, fragments, "Live worker finished");
}

#[derive(Debug, PartialEq, Eq)]
enum ChunkFeed {
    Open,
    Closed,
}

/// Send every queued chunk in capture order. `Closed` once the sending side
/// is gone and the queue is empty.
fn drain_chunks<E>(
    chunks: &mpsc::Receiver<MediaChunk>,
    sent: &mut u64,
    mut send: impl FnMut(&MediaChunk) -> Result<(), E>,
) -> Result<ChunkFeed, E> {
    loop {
        match chunks.try_recv() {
            Ok(chunk) => {
                send(&chunk)?;
                *sent += 1;
            }
            Err(mpsc::TryRecvError::Empty) => return Ok(ChunkFeed::Open),
            Err(mpsc::TryRecvError::Disconnected) => return Ok(ChunkFeed::Closed),
        }
    }
}

/// Returns `false` when the session must end.
fn handle_server_message(msg: &str, events: &mpsc::Sender<LiveEvent>, fragments: &mut u64) -> bool {
    if let Some(error) = parse_error(msg) {
        tracing::error!(%error, "Live server error");
        let _ = events.send(LiveEvent::Error(error));
        return false;
    }
    if let Some(text) = parse_input_transcription(msg) {
        if !text.trim().is_empty() {
            *fragments += 1;
            tracing::trace!(fragment = %text, "Transcription fragment");
            if events.send(LiveEvent::Fragment(text)).is_err() {
                return false;
            }
        }
    }
    true
}

/// Failures during a deliberate stop are expected and not reported.
fn report(events: &mpsc::Sender<LiveEvent>, stop_signal: &AtomicBool, message: String) {
    if stop_signal.load(Ordering::SeqCst) {
        return;
    }
    tracing::warn!(%message, "Live stream ended unexpectedly");
    let _ = events.send(LiveEvent::Error(message));
}
