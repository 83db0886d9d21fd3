//! WebSocket connection and wire messages for the live transcription session

use anyhow::Result;
use native_tls::TlsStream;
use std::net::TcpStream;
use std::time::{Duration, Instant};
use tungstenite::{Message, WebSocket};

use crate::api::prompts::LIVE_SYSTEM_INSTRUCTION;
use crate::audio::MediaChunk;
use crate::model_config::LIVE_MODEL;

pub type LiveSocket = WebSocket<TlsStream<TcpStream>>;

const LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Create TLS WebSocket connection to the Gemini Live API
pub fn connect_websocket(api_key: &str) -> Result<LiveSocket> {
    let ws_url = format!("{}?key={}", LIVE_URL, api_key);

    let url = url::Url::parse(&ws_url)?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("No host in URL"))?;
    let port = url.port_or_known_default().unwrap_or(443);

    use std::net::ToSocketAddrs;
    let addr = format!("{}:{}", host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve hostname: {}", host))?;

    let tcp_stream = TcpStream::connect_timeout(&addr, Duration::from_secs(10))?;
    tcp_stream.set_read_timeout(Some(Duration::from_secs(30)))?;
    tcp_stream.set_write_timeout(Some(Duration::from_secs(30)))?;
    tcp_stream.set_nodelay(true)?;

    let connector = native_tls::TlsConnector::new()?;
    let tls_stream = connector.connect(host, tcp_stream)?;

    let (socket, _response) = tungstenite::client::client(&ws_url, tls_stream)?;

    Ok(socket)
}

/// Short read timeout so the worker can interleave reads with chunk sends
pub fn set_socket_nonblocking(socket: &mut LiveSocket) -> Result<()> {
    let stream = socket.get_mut();
    let tcp_stream = stream.get_mut();
    tcp_stream.set_read_timeout(Some(Duration::from_millis(50)))?;
    Ok(())
}

/// Input transcription only; the model's audio replies are ignored.
pub fn setup_message() -> serde_json::Value {
    serde_json::json!({
        "setup": {
            "model": format!("models/{}", LIVE_MODEL),
            "generationConfig": {
                "responseModalities": ["AUDIO"]
            },
            "inputAudioTranscription": {},
            "systemInstruction": {
                "parts": [{ "text": LIVE_SYSTEM_INSTRUCTION }]
            }
        }
    })
}

pub fn send_setup_message(socket: &mut LiveSocket) -> Result<()> {
    socket.write(Message::Text(setup_message().to_string().into()))?;
    socket.flush()?;
    Ok(())
}

/// Block until `setupComplete` arrives or `timeout` elapses.
pub fn wait_for_setup(socket: &mut LiveSocket, timeout: Duration) -> Result<()> {
    let started = Instant::now();
    loop {
        if started.elapsed() > timeout {
            return Err(anyhow::anyhow!("Setup timeout"));
        }
        match socket.read() {
            Ok(Message::Text(msg)) => {
                if let Some(error) = parse_error(msg.as_str()) {
                    return Err(anyhow::anyhow!(error));
                }
                if is_setup_complete(msg.as_str()) {
                    return Ok(());
                }
            }
            Ok(Message::Binary(data)) => {
                if let Ok(text) = std::str::from_utf8(&data) {
                    if is_setup_complete(text) {
                        return Ok(());
                    }
                }
            }
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|f| f.reason.as_str().to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "Connection closed during setup".to_string());
                return Err(anyhow::anyhow!(reason));
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e)) if is_timeout(e) => {}
            Err(e) => return Err(anyhow::anyhow!("Setup error: {}", e)),
        }
    }
}

pub fn media_chunk_message(chunk: &MediaChunk) -> serde_json::Value {
    serde_json::json!({
        "realtimeInput": {
            "mediaChunks": [chunk]
        }
    })
}

pub fn send_media_chunk(socket: &mut LiveSocket, chunk: &MediaChunk) -> Result<()> {
    socket.write(Message::Text(media_chunk_message(chunk).to_string().into()))?;
    socket.flush()?;
    Ok(())
}

/// Read timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows.
pub fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

/// Parse inputTranscription from a server message (what the child said)
pub fn parse_input_transcription(msg: &str) -> Option<String> {
    let json = serde_json::from_str::<serde_json::Value>(msg).ok()?;
    json.get("serverContent")?
        .get("inputTranscription")?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

pub fn is_setup_complete(msg: &str) -> bool {
    msg.contains("setupComplete")
}

pub fn parse_error(msg: &str) -> Option<String> {
    let json = serde_json::from_str::<serde_json::Value>(msg).ok()?;
    let error = json.get("error")?;
    Some(
        error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
    )
}
