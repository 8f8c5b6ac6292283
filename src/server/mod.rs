//! WebSocket chat transport and artifact download routes.
//!
//! Wire protocol (JSON over WS, mirroring the browser client):
//! - client → server: `user_message` with free text, or `file_upload` with
//!   the document payload.
//! - server → client: `bot_message` carrying the reply, the authoring agent,
//!   and the upload/approval flags.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use crate::error::ArtifactError;
use crate::orchestrator::{Orchestrator, TurnOutcome};
use crate::sanction::ArtifactStore;
use crate::session::SessionStore;

// ── JSON Protocol ───────────────────────────────────────────────────────

/// Message from browser client → server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    #[serde(rename = "user_message")]
    UserMessage { message: String },
    #[serde(rename = "file_upload")]
    FileUpload { file_data: String, file_type: String },
}

/// Message from server → browser client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ServerMessage {
    #[serde(rename = "bot_message")]
    BotMessage {
        message: String,
        agent: String,
        timestamp: String,
        requires_upload: bool,
        loan_approved: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        sanction_letter_url: Option<String>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    fn greeting(text: &str) -> Self {
        Self::BotMessage {
            message: text.to_string(),
            agent: "Master Agent".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            requires_upload: false,
            loan_approved: false,
            sanction_letter_url: None,
        }
    }

    fn from_outcome(outcome: TurnOutcome) -> Self {
        Self::BotMessage {
            message: outcome.reply,
            agent: outcome.agent.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            requires_upload: outcome.requires_upload,
            loan_approved: outcome.loan_approved,
            sanction_letter_url: outcome.sanction_letter_url,
        }
    }
}

// ── Routes ──────────────────────────────────────────────────────────────

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub artifacts: Arc<ArtifactStore>,
}

/// Build the application router.
pub fn app_routes(state: AppState) -> Router {
    Router::new()
        .route("/ws/chat", get(ws_chat_handler))
        .route("/download_sanction_letter/{filename}", get(download_letter))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn ws_chat_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One socket = one applicant session. The session lives exactly as long
/// as the connection, and its lock is held per turn so turns are processed
/// strictly in arrival order.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (session_id, handle) = state.sessions.create().await;
    debug!(session = %session_id, "chat client connected");

    let greeting = ServerMessage::greeting(state.orchestrator.start_conversation());
    if send(&mut socket, &greeting).await.is_err() {
        state.sessions.remove(session_id).await;
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let response = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::UserMessage { message }) => {
                        let mut session = handle.lock().await;
                        let outcome = state.orchestrator.handle_turn(&mut session, &message).await;
                        ServerMessage::from_outcome(outcome)
                    }
                    Ok(ClientMessage::FileUpload {
                        file_data,
                        file_type,
                    }) => {
                        let mut session = handle.lock().await;
                        let outcome = state
                            .orchestrator
                            .handle_upload(&mut session, file_data.as_bytes(), &file_type)
                            .await;
                        ServerMessage::from_outcome(outcome)
                    }
                    Err(e) => ServerMessage::Error {
                        message: format!("invalid message: {e}"),
                    },
                };
                if send(&mut socket, &response).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            // Ping/pong handled by axum; binary frames are not part of the
            // protocol.
            _ => {}
        }
    }

    state.sessions.remove(session_id).await;
    debug!(session = %session_id, "chat client disconnected");
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(json.into())).await
}

/// GET /download_sanction_letter/{filename}
///
/// Serves a previously generated letter. Traversal attempts and wrong
/// extensions are a 400; a missing file is a 404.
async fn download_letter(
    Path(filename): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.artifacts.read(&filename).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(ArtifactError::InvalidFilename(name)) => {
            warn!(filename = %name, "rejected artifact request");
            (StatusCode::BAD_REQUEST, "Invalid file type").into_response()
        }
        Err(ArtifactError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Err(e) => {
            warn!(error = %e, "artifact read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}
