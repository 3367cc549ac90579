//! HTTP surface
//!
//! - GET    /api/status                - health and config summary
//! - POST   /api/chat/stream           - run a turn, SSE events
//! - GET    /api/sessions/{id}/messages - retained conversation
//! - DELETE /api/sessions/{id}          - hard reset (drops the session)
//!
//! The session id travels in the `x-session-id` response header; clients
//! send it back in the request body to continue a conversation.

use anyhow::Result;
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{
        IntoResponse, Json, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{convert::Infallible, sync::Arc};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::chat::{self, ChatEngine, ChatEvent, STREAM_EVENT_BUFFER, TurnStatus};
use crate::config::Config;
use crate::error::ChatError;
use crate::persona::Persona;
use crate::session::{SessionStore, Turn};

pub const SESSION_HEADER: &str = "x-session-id";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Chat request from a client
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    /// Switch persona before this turn
    #[serde(default)]
    pub persona: Option<String>,
    /// Switch home location before this turn
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionMessages {
    pub session_id: Uuid,
    pub persona: Persona,
    pub location: String,
    pub messages: Vec<Turn>,
}

// ============================================================================
// Server State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
    pub sessions: SessionStore,
    pub search_enabled: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, ChatError> {
        Ok(Self {
            engine: Arc::new(ChatEngine::from_config(config)?),
            sessions: SessionStore::from_config(config),
            search_enabled: config.search_enabled(),
        })
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/chat/stream", post(chat_stream_handler))
        .route("/api/sessions/{id}/messages", get(messages_handler))
        .route("/api/sessions/{id}", delete(reset_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: &Config, host: &str, port: u16) -> Result<()> {
    let state = AppState::from_config(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) | ChatError::UnknownPersona(_) => {
                StatusCode::BAD_REQUEST
            }
            ChatError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ChatError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    let settings = state.engine.settings();
    Json(json!({
        "status": "ok",
        "model": settings.model,
        "mention_policy": settings.mention_policy,
        "search_enabled": state.search_enabled,
        "sessions": state.sessions.len(),
    }))
}

async fn messages_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionMessages>, ChatError> {
    let session = state.sessions.get(id)?;
    let session = session.lock().await;

    Ok(Json(SessionMessages {
        session_id: session.id,
        persona: session.persona,
        location: session.home_location.clone(),
        messages: session.conversation.turns().cloned().collect(),
    }))
}

async fn reset_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ChatError> {
    state.sessions.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn chat_stream_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ChatError> {
    // Reject bad input before the stream starts so it gets a real status code
    chat::validate(&request.message)?;
    let persona = request.persona.as_deref().map(str::parse::<Persona>).transpose()?;

    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);
    let session = state.sessions.get_or_create(Some(session_id));

    let (tx, rx) = mpsc::channel::<ChatEvent>(STREAM_EVENT_BUFFER);

    // The turn runs to completion even if the client disconnects; a closed
    // channel only stops it consuming the model stream.
    let engine = state.engine.clone();
    tokio::spawn(async move {
        let mut session = session.lock().await;
        if let Some(persona) = persona {
            session.persona = persona;
        }
        if let Some(location) = request.location {
            session.home_location = location.trim().to_string();
        }

        if let Err(e) = engine.run_turn(&mut session, &request.message, tx.clone(), None).await {
            error!("Turn rejected: {}", e);
            let _ = tx.send(ChatEvent::Error { message: e.to_string() }).await;
            let _ = tx
                .send(ChatEvent::Done {
                    status: TurnStatus::Failed,
                })
                .await;
        }
    });

    let stream = async_stream::stream! {
        let mut rx = rx;
        while let Some(event) = rx.recv().await {
            let data = serde_json::to_string(&event).unwrap_or_default();
            yield Ok::<_, Infallible>(Event::default().data(data));
        }
    };

    let mut response = Sse::new(stream).keep_alive(KeepAlive::default()).into_response();
    if let Ok(value) = HeaderValue::from_str(&session_id.to_string()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}
