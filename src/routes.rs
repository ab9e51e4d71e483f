use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{DemoError, FlowError};
use crate::flow::{DemoFlow, Transition};
use crate::gemini::GenerationService;
use crate::models::{CreateSessionRequest, LocaleUpdate, PreviewRequest, SessionSnapshot, SourceUpdate};
use crate::renderer::{render_once, PreviewPanel};
use crate::sanitize::{parse_mock_data, sanitize};
use crate::session::{DemoSession, SessionHandle, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub generator: Arc<dyn GenerationService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(generator: Arc<dyn GenerationService>, config: AppConfig) -> Self {
        Self {
            sessions: SessionStore::default(),
            generator,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/demo", post(create_session))
        .route("/api/demo/:id", get(get_session).delete(delete_session))
        .route("/api/demo/:id/source", put(update_source))
        .route("/api/demo/:id/source/reset", post(reset_source))
        .route("/api/demo/:id/locale", put(update_locale))
        .route("/api/demo/:id/generate", post(generate))
        .route("/api/demo/:id/step/:step", post(navigate))
        .route("/api/demo/:id/restart", post(restart))
        .route("/api/demo/:id/banner/dismiss", post(dismiss_banner))
        .route("/api/demo/:id/preview", get(session_preview))
        .route("/api/preview", post(preview))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

fn session_handle(state: &AppState, id: Uuid) -> Result<SessionHandle, FlowError> {
    state
        .sessions
        .read()
        .get(&id)
        .cloned()
        .ok_or(FlowError::NotFound(id))
}

/// Runs `work` against one session on the blocking pool. Only that session
/// is locked while a component compiles or renders.
async fn on_session<T: Send + 'static>(
    state: &AppState,
    id: Uuid,
    work: impl FnOnce(&mut DemoSession) -> Result<T, FlowError> + Send + 'static,
) -> Result<T, FlowError> {
    let handle = session_handle(state, id)?;
    tokio::task::spawn_blocking(move || work(&mut handle.lock()))
        .await
        .map_err(|e| FlowError::Internal(e.to_string()))?
}

/// Runs a transition against one session and returns its new snapshot.
async fn transition(
    state: &AppState,
    id: Uuid,
    step: impl FnOnce(DemoFlow) -> Transition + Send + 'static,
) -> Result<Json<SessionSnapshot>, FlowError> {
    on_session(state, id, move |session| {
        session.apply(step)?;
        Ok(session.snapshot())
    })
    .await
    .map(Json)
}

pub async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let session = DemoSession::new(body.source, body.locale);
    let snapshot = session.snapshot();
    tracing::info!("🚀 Created demo session {}", snapshot.id);
    state
        .sessions
        .write()
        .insert(session.id(), Arc::new(Mutex::new(session)));
    (StatusCode::CREATED, Json(snapshot))
}

pub async fn get_session(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, FlowError> {
    on_session(&state, id, |session| Ok(session.snapshot()))
        .await
        .map(Json)
}

pub async fn delete_session(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, FlowError> {
    let handle = state
        .sessions
        .write()
        .remove(&id)
        .ok_or(FlowError::NotFound(id))?;
    tokio::task::spawn_blocking(move || handle.lock().close())
        .await
        .map_err(|e| FlowError::Internal(e.to_string()))?;
    tracing::info!("👋 Closed demo session {}", id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_source(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<SourceUpdate>,
) -> Result<Json<SessionSnapshot>, FlowError> {
    transition(&state, id, move |flow| flow.edit_source(body.source)).await
}

pub async fn update_locale(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<LocaleUpdate>,
) -> Result<Json<SessionSnapshot>, FlowError> {
    transition(&state, id, move |flow| flow.set_locale(body.locale)).await
}

pub async fn reset_source(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, FlowError> {
    transition(&state, id, DemoFlow::reset_source).await
}

pub async fn generate(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, FlowError> {
    // Detached from the request: once a session enters Awaiting, it leaves
    // it even if the client disconnects.
    let task = tokio::spawn(async move {
        let (request, ticket) =
            on_session(&state, id, |session| session.begin_generation()).await?;

        let outcome = state
            .generator
            .generate(&request)
            .await
            .map_err(DemoError::from)
            .and_then(|raw| sanitize(&raw));

        let finished = on_session(&state, id, move |session| {
            session.finish_generation(&ticket, outcome)?;
            Ok(session.snapshot())
        })
        .await;
        match finished {
            Err(FlowError::NotFound(_)) => {
                tracing::warn!("🗑️ Session {} closed while generating; result discarded", id);
                Err(FlowError::Gone)
            }
            other => other,
        }
    });
    task.await
        .map_err(|e| FlowError::Internal(e.to_string()))?
        .map(Json)
}

pub async fn navigate(
    Path((id, step)): Path<(Uuid, u8)>,
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, FlowError> {
    let limits = state.config.limits;
    transition(&state, id, move |flow| flow.navigate(step, limits)).await
}

pub async fn restart(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, FlowError> {
    on_session(&state, id, |session| {
        session.restart();
        Ok(session.snapshot())
    })
    .await
    .map(Json)
}

pub async fn dismiss_banner(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, FlowError> {
    transition(&state, id, |flow| Ok(flow.dismiss_banner())).await
}

pub async fn session_preview(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PreviewPanel>, FlowError> {
    on_session(&state, id, |session| {
        let state_name = session.flow().state_name();
        session.preview().ok_or(FlowError::InvalidTransition {
            action: "show the preview",
            state: state_name,
        })
    })
    .await
    .map(Json)
}

/// Stateless compile + render of a component against inline data.
pub async fn preview(State(state): State<AppState>, Json(body): Json<PreviewRequest>) -> Response {
    let data = match (body.data, body.json_code) {
        (Some(data), _) => data,
        (None, Some(json_code)) => match parse_mock_data(&json_code) {
            Ok(data) => data,
            Err(e) => return unprocessable(&e),
        },
        (None, None) => Vec::new(),
    };
    let limits = state.config.limits;
    let rendered =
        tokio::task::spawn_blocking(move || render_once(&body.code, data, body.class_name, limits))
            .await;
    match rendered {
        Ok(panel) => Json(panel).into_response(),
        Err(e) => FlowError::Internal(e.to_string()).into_response(),
    }
}

fn unprocessable(e: &DemoError) -> Response {
    let body = json!({ "error": e.kind(), "message": e.to_string() });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
}
