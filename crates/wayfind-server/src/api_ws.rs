//! Voice WebSocket handler and connection management.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        ConnectInfo, Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use futures_util::{stream::SplitStream, SinkExt, StreamExt};
use serde::Serialize;
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use uuid::Uuid;
use wayfind_intent::IntentResult;

/// Message sent when an audio payload cannot be decoded or resolved.
pub const AUDIO_ERROR_MESSAGE: &str = "Error processing audio data";

/// Message sent for frames the voice protocol does not expect.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Standard alphabet; padding optional so browser encoders that strip it
/// still decode.
///
/// Stricter than decoders that skip non-alphabet bytes: only leading and
/// trailing whitespace is trimmed, and whitespace or any other stray byte
/// inside the payload is a decode error. Looser on padding: payloads that
/// such decoders reject for missing `=` are accepted here.
const AUDIO_BASE64: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// How long the writer may take to flush queued frames after the reader exits.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Outgoing frame on `/ws/voice`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VoiceResponse {
    Success { text: String, intent: IntentResult },
    Error { message: String },
}

impl VoiceResponse {
    fn error(message: &str) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }
}

/// One open voice connection.
#[derive(Debug, Clone)]
pub struct ConnectionSession {
    pub id: Uuid,
    pub remote_addr: SocketAddr,
    pub connected_at: Instant,
}

/// Tracks open voice sessions.
///
/// Uses `std::sync::RwLock`: every acquisition is a single HashMap operation
/// that never spans an `.await`, which also lets [`SessionGuard`] unregister
/// from `Drop`.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    sessions: Arc<RwLock<HashMap<Uuid, ConnectionSession>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an accepted connection and returns its session ID.
    pub fn connect(&self, remote_addr: SocketAddr) -> Uuid {
        let session = ConnectionSession {
            id: Uuid::new_v4(),
            remote_addr,
            connected_at: Instant::now(),
        };
        let id = session.id;
        let total = {
            let mut sessions = self.write();
            sessions.insert(id, session);
            sessions.len()
        };
        tracing::info!(session_id = %id, remote_addr = %remote_addr, total, "client connected");
        id
    }

    /// Removes a session. Unknown or already-removed IDs are a no-op.
    ///
    /// Returns `true` if the session was active.
    pub fn disconnect(&self, session_id: Uuid) -> bool {
        let (removed, total) = {
            let mut sessions = self.write();
            let removed = sessions.remove(&session_id);
            (removed, sessions.len())
        };
        match removed {
            Some(session) => {
                tracing::info!(
                    session_id = %session_id,
                    duration_ms = session.connected_at.elapsed().as_millis() as u64,
                    total,
                    "client disconnected"
                );
                true
            }
            None => {
                tracing::debug!(session_id = %session_id, "disconnect for inactive session ignored");
                false
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.read().len()
    }

    pub fn is_active(&self, session_id: Uuid) -> bool {
        self.read().contains_key(&session_id)
    }

    /// Registers a connection and returns a guard that unregisters it on drop.
    pub fn register(&self, remote_addr: SocketAddr) -> SessionGuard {
        SessionGuard {
            id: self.connect(remote_addr),
            manager: self.clone(),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, ConnectionSession>> {
        self.sessions.read().unwrap_or_else(|poisoned| {
            tracing::error!("connection manager lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, ConnectionSession>> {
        self.sessions.write().unwrap_or_else(|poisoned| {
            tracing::error!("connection manager lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

/// Keeps a session registered for as long as it is alive.
///
/// Dropping the guard unregisters the session however the handler exits,
/// including by panic.
pub struct SessionGuard {
    id: Uuid,
    manager: ConnectionManager,
}

impl SessionGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.manager.disconnect(self.id);
    }
}

/// WebSocket handler: `GET /ws/voice`.
pub async fn voice_ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(state.websocket.max_message_bytes)
        .on_upgrade(move |socket| handle_voice_socket(socket, state, addr))
}

/// Drives one voice session from accept to close.
async fn handle_voice_socket(socket: WebSocket, state: Arc<AppState>, addr: SocketAddr) {
    let guard = state.connection_manager.register(addr);
    let session_id = guard.id();

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<AxumMessage>(32);

    // Writer: forwards queued frames and sends keepalive pings.
    let ping_interval = state.websocket.ping_interval();
    let mut send_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            tokio::select! {
                queued = rx.recv() => match queued {
                    Some(msg) => {
                        if sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if sender.send(AxumMessage::Ping(Default::default())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sender.close().await;
    });

    run_voice_loop(&state, session_id, &mut receiver, &tx).await;

    drop(tx);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut send_task)
        .await
        .is_err()
    {
        send_task.abort();
    }

    drop(guard);
}

/// Reads frames in order until the peer goes away.
///
/// Each frame is fully processed before the next is read.
async fn run_voice_loop(
    state: &AppState,
    session_id: Uuid,
    receiver: &mut SplitStream<WebSocket>,
    tx: &mpsc::Sender<AxumMessage>,
) {
    let idle_limit = state.websocket.ping_interval() + state.websocket.ping_timeout();

    loop {
        let next = match tokio::time::timeout(idle_limit, receiver.next()).await {
            Ok(next) => next,
            Err(_) => {
                tracing::info!(
                    session_id = %session_id,
                    idle_secs = idle_limit.as_secs(),
                    "no frames within keepalive window, closing voice session"
                );
                break;
            }
        };

        match next {
            None => {
                tracing::info!(session_id = %session_id, "voice socket stream ended");
                break;
            }
            Some(Ok(AxumMessage::Close(_))) => {
                tracing::info!(session_id = %session_id, "voice socket disconnected");
                break;
            }
            Some(Ok(AxumMessage::Text(payload))) => {
                tracing::info!(session_id = %session_id, bytes = payload.len(), "received audio data");
                let response = process_audio(state, payload.as_str()).await;
                if send_response(tx, &response).await.is_err() {
                    break;
                }
            }
            Some(Ok(AxumMessage::Ping(_))) | Some(Ok(AxumMessage::Pong(_))) => {}
            Some(Ok(AxumMessage::Binary(bytes))) => {
                tracing::warn!(
                    session_id = %session_id,
                    bytes = bytes.len(),
                    "unexpected binary frame on voice socket"
                );
                if send_response(tx, &VoiceResponse::error(INTERNAL_ERROR_MESSAGE))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Some(Err(e)) => {
                tracing::error!(session_id = %session_id, "voice socket error: {}", e);
                if send_response(tx, &VoiceResponse::error(INTERNAL_ERROR_MESSAGE))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    }
}

/// Decodes one audio payload, transcribes it and resolves the transcript.
///
/// Every failure becomes an error frame; the session stays open.
pub async fn process_audio(state: &AppState, payload: &str) -> VoiceResponse {
    let audio = match AUDIO_BASE64.decode(payload.trim()) {
        Ok(audio) => audio,
        Err(e) => {
            tracing::warn!("failed to decode audio payload: {}", e);
            return VoiceResponse::error(AUDIO_ERROR_MESSAGE);
        }
    };

    let transcriber = state.transcriber.clone();
    let transcript = match tokio::task::spawn_blocking(move || transcriber.transcribe(&audio)).await
    {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::error!("transcription failed: {}", e);
            return VoiceResponse::error(AUDIO_ERROR_MESSAGE);
        }
        Err(e) => {
            tracing::error!("transcription task failed: {}", e);
            return VoiceResponse::error(AUDIO_ERROR_MESSAGE);
        }
    };

    match state
        .resolver
        .clone()
        .resolve_blocking_offloaded(transcript.clone())
        .await
    {
        Ok(intent) => {
            tracing::info!(
                intent = %intent.intent,
                confidence = intent.confidence,
                action = intent.action.type_name(),
                "resolved voice intent"
            );
            VoiceResponse::Success {
                text: transcript,
                intent,
            }
        }
        Err(e) => {
            tracing::error!("voice intent resolution failed: {}", e);
            VoiceResponse::error(AUDIO_ERROR_MESSAGE)
        }
    }
}

/// Queues a JSON frame for the writer.
///
/// Returns `Err` once the writer has gone away, meaning the peer is gone.
async fn send_response(tx: &mpsc::Sender<AxumMessage>, response: &VoiceResponse) -> Result<(), ()> {
    let json = match serde_json::to_string(response) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("failed to serialize voice response: {}", e);
            return Ok(());
        }
    };
    tx.send(AxumMessage::Text(json.into())).await.map_err(|_| {
        tracing::warn!("voice socket writer closed, dropping response");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wayfind_intent::Action;

    fn addr() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    #[test]
    fn success_frame_shape() {
        let response = VoiceResponse::Success {
            text: "show me the way to the library".to_string(),
            intent: IntentResult {
                intent: "navigate to location".to_string(),
                confidence: 0.75,
                action: Action::Navigate {
                    destination: "library".to_string(),
                },
            },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "success",
                "text": "show me the way to the library",
                "intent": {
                    "intent": "navigate to location",
                    "confidence": 0.75,
                    "action": {"type": "NAVIGATE", "params": {"destination": "library"}}
                }
            })
        );
    }

    #[test]
    fn error_frame_shape() {
        let value = serde_json::to_value(VoiceResponse::error(AUDIO_ERROR_MESSAGE)).unwrap();
        assert_eq!(
            value,
            json!({"status": "error", "message": "Error processing audio data"})
        );
    }

    #[test]
    fn decoder_accepts_missing_padding() {
        assert_eq!(AUDIO_BASE64.decode("aGk=").unwrap(), b"hi");
        assert_eq!(AUDIO_BASE64.decode("aGk").unwrap(), b"hi");
        assert!(AUDIO_BASE64.decode("not base64!!").is_err());
    }

    #[test]
    fn decoder_rejects_embedded_whitespace() {
        assert!(AUDIO_BASE64.decode("aGVs bG8=").is_err());
        assert!(AUDIO_BASE64.decode("aGVs\nbG8=").is_err());
        assert_eq!(AUDIO_BASE64.decode("  aGVsbG8=\n".trim()).unwrap(), b"hello");
    }

    #[test]
    fn connect_disconnect_counts() {
        let cm = ConnectionManager::new();
        let ids: Vec<Uuid> = (0..5).map(|_| cm.connect(addr())).collect();
        assert_eq!(cm.active_count(), 5);

        assert!(cm.disconnect(ids[0]));
        assert!(cm.disconnect(ids[1]));
        assert_eq!(cm.active_count(), 3);

        assert!(!cm.disconnect(ids[1]));
        assert_eq!(cm.active_count(), 3);
        assert!(!cm.is_active(ids[0]));
        assert!(cm.is_active(ids[4]));
    }

    #[test]
    fn guard_unregisters_on_drop() {
        let cm = ConnectionManager::new();
        let guard = cm.register(addr());
        let id = guard.id();
        assert!(cm.is_active(id));
        drop(guard);
        assert!(!cm.is_active(id));
        assert_eq!(cm.active_count(), 0);
    }

    #[test]
    fn guard_unregisters_on_panic() {
        let cm = ConnectionManager::new();
        let cm_inner = cm.clone();
        let outcome = std::panic::catch_unwind(move || {
            let _guard = cm_inner.register(addr());
            panic!("session handler blew up");
        });
        assert!(outcome.is_err());
        assert_eq!(cm.active_count(), 0);
    }
}
