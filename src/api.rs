/// HTTP API для слоя представления

use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::analysis::EdaReport;
use crate::error::PipelineError;
use crate::pipeline::{Pipeline, PrepareSummary};
use crate::sources::SourceStatus;
use crate::types::{ModelResults, RegionFact};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Mutex<Pipeline>>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
        }
    }
}

/// Ошибка конвейера в виде JSON-ответа `{ error, kind }`
#[derive(Debug)]
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        Self(error)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            PipelineError::MissingSources(_) | PipelineError::NotPrepared | PipelineError::NoResults => {
                StatusCode::NOT_FOUND
            }
            PipelineError::SchemaMismatch { .. }
            | PipelineError::AmbiguousHeader { .. }
            | PipelineError::FeatureMismatch { .. }
            | PipelineError::EmptyDataset(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Load { .. } | PipelineError::ModelLoad { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self.0);
        } else {
            tracing::warn!("{}", self.0);
        }

        let mut body = serde_json::json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        });
        if let PipelineError::MissingSources(statuses) = &self.0 {
            body["sources"] = serde_json::json!(statuses);
        }

        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/sources", get(sources))
        .route("/api/prepare", post(prepare))
        .route("/api/regions", get(regions))
        .route("/api/eda", get(eda))
        .route("/api/model/predict", post(run_model))
        .route("/api/model/results", get(model_results))
        .route("/api/cache/invalidate", post(invalidate_cache))
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Adiwiyata ML API (Rust)",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn sources(State(state): State<AppState>) -> Json<Vec<SourceStatus>> {
    let pipeline = state.pipeline.lock().await;
    Json(pipeline.sources())
}

async fn prepare(State(state): State<AppState>) -> ApiResult<PrepareSummary> {
    tracing::info!("Prepare request");
    let mut pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.prepare()?))
}

async fn regions(State(state): State<AppState>) -> ApiResult<Vec<RegionFact>> {
    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.prepared()?.regions.clone()))
}

async fn eda(State(state): State<AppState>) -> ApiResult<EdaReport> {
    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.eda()?))
}

async fn run_model(State(state): State<AppState>) -> ApiResult<ModelResults> {
    tracing::info!("Model request");
    let mut pipeline = state.pipeline.lock().await;
    let results = pipeline.run_model()?;
    Ok(Json(ModelResults::clone(&results)))
}

async fn model_results(State(state): State<AppState>) -> ApiResult<ModelResults> {
    let pipeline = state.pipeline.lock().await;
    let results = pipeline.results()?;
    Ok(Json(ModelResults::clone(&results)))
}

async fn invalidate_cache(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut pipeline = state.pipeline.lock().await;
    pipeline.invalidate();
    Json(serde_json::json!({ "status": "invalidated" }))
}
