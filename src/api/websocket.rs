//! WebSocket handler for streaming wake word detection
//!
//! Clients send binary frames of 16-bit little-endian PCM and receive one JSON
//! text message per detection. Each connection owns a fresh [`Session`].

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::ApiState;
use crate::voice::{DetectionEvent, Session};

/// Outgoing WebSocket message to client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOutgoing {
    /// A wake phrase fired
    Detection {
        /// Phrase identifier
        model: String,
        /// Score rounded to three decimals
        score: f64,
        /// Epoch milliseconds
        timestamp: i64,
    },
    /// Unrecoverable session fault; the connection closes after this
    Error { message: String },
}

impl From<DetectionEvent> for WsOutgoing {
    fn from(event: DetectionEvent) -> Self {
        Self::Detection {
            model: event.phrase,
            score: round_score(event.score),
            timestamp: event.timestamp_ms,
        }
    }
}

/// Round a score to three decimals for presentation
#[must_use]
pub fn round_score(score: f32) -> f64 {
    (f64::from(score) * 1000.0).round() / 1000.0
}

/// Build WebSocket router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ws", get(ws_upgrade)).with_state(state)
}

/// Handle WebSocket upgrade request
async fn ws_upgrade(State(state): State<Arc<ApiState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let session_id = Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    tracing::info!(session_id = %session_id, "client connected");

    let engine = match state.scoring.get().await {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "scoring engine unavailable, closing session");
            let error = WsOutgoing::Error { message: e.to_string() };
            if let Ok(msg) = serde_json::to_string(&error) {
                let _ = sender.send(Message::Text(msg.into())).await;
            }
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    // Create channel for sending messages back to client
    let (tx, mut rx) = mpsc::channel::<WsOutgoing>(32);

    // Forward messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let fatal = matches!(msg, WsOutgoing::Error { .. });
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to encode outgoing message"),
            }
            if fatal {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    });

    let mut session = Session::new(session_id.clone(), &state.config, engine);
    let recv_session_id = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!(session_id = %recv_session_id, error = %e, "transport error");
                    break;
                }
            };

            match msg {
                Message::Binary(data) => {
                    session.feed(&data);
                    while let Some(events) = session.process_next(Instant::now()).await {
                        for event in events {
                            if tx.send(WsOutgoing::from(event)).await.is_err() {
                                session.close();
                                return;
                            }
                        }
                    }
                }
                Message::Text(_) => {
                    tracing::warn!(session_id = %recv_session_id, "text frame on audio stream, closing session");
                    let error = WsOutgoing::Error {
                        message: "expected binary PCM audio frames".to_string(),
                    };
                    let _ = tx.send(error).await;
                    break;
                }
                Message::Close(_) => {
                    tracing::debug!(session_id = %recv_session_id, "close frame received");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
        session.close();
    });

    // The receive side finishing lets the send side drain; a failed send aborts receiving
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => {
            let _ = send_task.await;
        }
    }

    tracing::info!(session_id = %session_id, "client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_score() {
        assert!((round_score(0.123_456) - 0.123).abs() < 1e-9);
        assert!((round_score(0.9996) - 1.0).abs() < 1e-9);
        assert!(round_score(0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_detection_wire_format() {
        let msg = WsOutgoing::from(DetectionEvent {
            phrase: "hey_jarvis".to_string(),
            score: 0.5,
            timestamp_ms: 1_700_000_000_000,
        });
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "type": "detection",
                "model": "hey_jarvis",
                "score": 0.5,
                "timestamp": 1_700_000_000_000_i64,
            })
        );
    }

    #[test]
    fn test_error_wire_format() {
        let msg = WsOutgoing::Error {
            message: "boom".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"error","message":"boom"}"#
        );
    }
}
