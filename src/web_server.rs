use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::session::SessionId;
use crate::chat::{ChatError, ChatService};

pub const SESSION_COOKIE: &str = "session_id";

const INDEX_HTML: &str = include_str!("../templates/index.html");

#[derive(Clone)]
pub struct AppState {
    chat: Arc<ChatService>,
}

impl AppState {
    pub fn new(chat: Arc<ChatService>) -> Self {
        Self { chat }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

impl ChatResponse {
    fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ChatError::EmptyMessage => (StatusCode::BAD_REQUEST, "Mensagem vazia"),
            ChatError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Erro: Servidor de IA indisponível.",
            ),
            ChatError::Upstream(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Erro de conexão. Tente novamente.",
            ),
        };
        (status, Json(ChatResponse::new(message))).into_response()
    }
}

/// Serves the chat page and starts a fresh conversation for the caller.
async fn index_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.chat.start_session(session_from_headers(&headers)).await;
    with_session_cookie(Html(INDEX_HTML).into_response(), session)
}

async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            warn!("Rejected chat request: {}", rejection);
            return (
                StatusCode::BAD_REQUEST,
                Json(ChatResponse::new("Requisição inválida")),
            )
                .into_response();
        }
    };

    if let Err(e) = state.chat.check(&request.message) {
        return e.into_response();
    }

    let known = session_from_headers(&headers);
    let session = state.chat.resolve_session(known).await;

    let response = match state.chat.exchange(session, &request.message).await {
        Ok(reply) => Json(ChatResponse::new(reply)).into_response(),
        Err(e) => e.into_response(),
    };

    if known == Some(session) {
        response
    } else {
        with_session_cookie(response, session)
    }
}

fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

fn with_session_cookie(mut response: Response, session: SessionId) -> Response {
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, session);
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    response
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to address {}", addr))?;

    info!("Web server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
            }
        })
        .await
        .wrap_err("Web server failed")?;

    Ok(())
}
