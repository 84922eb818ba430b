// SPDX-License-Identifier: MIT

//! JSON/HTTP surface over the graph engine
//!
//! Runs are started against a named graph; resume, inspect and clear work by
//! thread id and rebuild the graph recorded in the thread's checkpoint.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adk::error::{GraphError, PauseGraphError};
use crate::pausegraph::catalog::GraphCatalog;
use crate::pausegraph::workflow::checkpoint::Checkpointer;
use crate::pausegraph::workflow::graph::{GraphEngine, ResumeInput, RunEvent, RunResult, ThreadLocks};
use crate::pausegraph::workflow::state::{ThreadId, WorkflowState};

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    catalog: Arc<GraphCatalog>,
    checkpointer: Arc<dyn Checkpointer>,
    locks: ThreadLocks,
}

impl AppState {
    pub fn new(catalog: GraphCatalog, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            catalog: Arc::new(catalog),
            checkpointer,
            locks: ThreadLocks::new(),
        }
    }

    async fn engine(&self, graph: &str) -> Result<GraphEngine, ApiError> {
        let compiled = self.catalog.build(graph).await?;
        Ok(GraphEngine::new(compiled, self.checkpointer.clone()).with_thread_locks(self.locks.clone()))
    }

    /// Engine for the graph that owns the thread's checkpoint
    async fn engine_for_thread(&self, thread_id: &ThreadId) -> Result<GraphEngine, ApiError> {
        let checkpoint = self
            .checkpointer
            .load(thread_id)
            .await
            .map_err(GraphError::from)?
            .ok_or_else(|| GraphError::UnknownThread {
                thread_id: thread_id.to_string(),
            })?;
        self.engine(&checkpoint.graph).await
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/graphs", get(list_graphs))
        .route("/api/runs", post(start_run).get(list_runs))
        .route("/api/runs/stream", post(stream_run))
        .route("/api/runs/{thread_id}", get(get_run).delete(clear_run))
        .route("/api/runs/{thread_id}/resume", post(resume_run))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> Result<(), PauseGraphError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(%addr, "pausegraph API listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Error body `{"error": "..."}` with a status derived from the error kind
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        let status = match &err {
            GraphError::UnknownThread { .. } => StatusCode::NOT_FOUND,
            GraphError::NotPaused { .. }
            | GraphError::NothingToContinue { .. }
            | GraphError::GraphMismatch { .. } => StatusCode::CONFLICT,
            GraphError::ResumeShape { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GraphError::NodeExecution { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<PauseGraphError> for ApiError {
    fn from(err: PauseGraphError) -> Self {
        if let PauseGraphError::Graph(inner) = err {
            return inner.into();
        }
        let status = match &err {
            PauseGraphError::UnknownGraph(_) => StatusCode::NOT_FOUND,
            PauseGraphError::Build(_) | PauseGraphError::Yaml(_) | PauseGraphError::Config(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("{}", self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct StartRunRequest {
    pub graph: String,
    #[serde(default)]
    pub input: Value,
    /// Generated from the current time when absent
    #[serde(default)]
    pub thread_id: Option<String>,
}

impl StartRunRequest {
    fn initial_state(&self) -> Result<WorkflowState, ApiError> {
        match &self.input {
            Value::Null => Ok(WorkflowState::empty()),
            other => WorkflowState::from_value(other.clone())
                .ok_or_else(|| ApiError::bad_request("input must be a JSON object")),
        }
    }

    fn thread_id(&self) -> ThreadId {
        self.thread_id
            .as_deref()
            .map(ThreadId::new)
            .unwrap_or_else(ThreadId::from_timestamp)
    }
}

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    /// A string resumes with text, a boolean with an approval
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub thread_id: ThreadId,
    #[serde(flatten)]
    pub result: RunResult,
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_graphs(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.catalog.list()))
}

async fn start_run(
    State(state): State<AppState>,
    Json(payload): Json<StartRunRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    let initial = payload.initial_state()?;
    let thread_id = payload.thread_id();
    let engine = state.engine(&payload.graph).await?;

    let result = engine.run(initial, &thread_id).await?;
    Ok(Json(RunResponse { thread_id, result }))
}

/// Streams `RunEvent`s, then a final `result` or `error` event
async fn stream_run(
    State(state): State<AppState>,
    Json(payload): Json<StartRunRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let initial = payload.initial_state()?;
    let thread_id = payload.thread_id();
    let engine = state.engine(&payload.graph).await?;

    let (tx, rx) = mpsc::channel::<Event>(100);
    tokio::spawn(async move {
        let (events_tx, mut events_rx) = mpsc::channel::<RunEvent>(100);
        let forward = {
            let tx = tx.clone();
            tokio::spawn(async move {
                while let Some(event) = events_rx.recv().await {
                    if tx.send(json_event("step", &event)).await.is_err() {
                        break;
                    }
                }
            })
        };

        log::info!("Streaming run of '{}' on thread {}", payload.graph, thread_id);
        let outcome = engine.run_stream(initial, &thread_id, events_tx).await;
        // All step events are delivered before the final one
        let _ = forward.await;

        let last = match outcome {
            Ok(result) => json_event("result", &RunResponse { thread_id, result }),
            Err(e) => {
                log::error!("Streaming run failed: {}", e);
                json_event("error", &json!({ "error": e.to_string() }))
            }
        };
        let _ = tx.send(last).await;
    });

    let stream = ReceiverStream::new(rx).map(Ok);
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1))))
}

fn json_event<T: Serialize>(name: &str, data: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(data)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

async fn list_runs(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let threads = state.checkpointer.list().await.map_err(GraphError::from)?;
    Ok(Json(json!(threads)))
}

async fn get_run(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let thread_id = ThreadId::new(thread_id);
    let checkpoint = state
        .checkpointer
        .load(&thread_id)
        .await
        .map_err(GraphError::from)?
        .ok_or_else(|| GraphError::UnknownThread {
            thread_id: thread_id.to_string(),
        })?;
    Ok(Json(json!(checkpoint)))
}

async fn resume_run(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Json(payload): Json<ResumeRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    let input = ResumeInput::from_json(&payload.value)
        .ok_or_else(|| ApiError::bad_request("value must be a string or a boolean"))?;
    let thread_id = ThreadId::new(thread_id);
    let engine = state.engine_for_thread(&thread_id).await?;

    let result = engine.resume(&thread_id, input).await?;
    Ok(Json(RunResponse { thread_id, result }))
}

async fn clear_run(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let thread_id = ThreadId::new(thread_id);
    state
        .checkpointer
        .clear(&thread_id)
        .await
        .map_err(GraphError::from)?;
    log::info!("Thread {}: cleared over HTTP", thread_id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pausegraph::workflow::checkpoint::InMemoryCheckpointer;
    use crate::pausegraph::workflow::registry::ToolRegistry;

    const APPROVAL: &str = r#"
name: approval
entry: ask
nodes:
  - { name: ask, kind: human, prompt: "Ship {item}?", approval_into: approved }
edges:
  - from: ask
    branches:
      - { when: "approved", to: __end__ }
    otherwise: ask
"#;

    fn app_state(dir: &std::path::Path) -> AppState {
        std::fs::write(dir.join("approval.yaml"), APPROVAL).unwrap();
        AppState::new(
            GraphCatalog::new(ToolRegistry::new(), dir),
            Arc::new(InMemoryCheckpointer::new()),
        )
    }

    #[tokio::test]
    async fn test_start_and_resume_over_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path());

        let Json(started) = start_run(
            State(state.clone()),
            Json(StartRunRequest {
                graph: "approval".to_string(),
                input: json!({"item": "v1.2"}),
                thread_id: Some("t-http".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(started.result.pause().unwrap().payload, json!("Ship v1.2?"));

        let Json(resumed) = resume_run(
            State(state.clone()),
            Path("t-http".to_string()),
            Json(ResumeRequest { value: json!(true) }),
        )
        .await
        .unwrap();
        assert!(resumed.result.is_completed());

        let err = resume_run(
            State(state),
            Path("t-http".to_string()),
            Json(ResumeRequest { value: json!(true) }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_resume_errors_map_to_status() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path());

        let err = resume_run(
            State(state.clone()),
            Path("missing".to_string()),
            Json(ResumeRequest { value: json!("hi") }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = resume_run(
            State(state),
            Path("missing".to_string()),
            Json(ResumeRequest { value: json!(42) }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_graph_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = start_run(
            State(app_state(dir.path())),
            Json(StartRunRequest {
                graph: "nope".to_string(),
                input: Value::Null,
                thread_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
