//! HTTP transport for raglab.
//!
//! Endpoints:
//! - `GET  /health`     liveness
//! - `POST /ingest`     rebuild the vector index from the data directory
//! - `GET  /documents`  indexed source identifiers
//! - `POST /chat`       answer a query as a server-sent event stream
//!
//! Built on Axum. Handlers depend on the [`AnswerSource`] and
//! [`KnowledgeBase`] seams so tests can swap in scripted stand-ins.

pub mod sse;

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Router, body::Body};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use raglab_agent::{ContextRetriever, FragmentStream, GeneratorSettings, ResponseGenerator};
use raglab_config::AppConfig;
use raglab_core::error::RetrievalError;
use raglab_core::retrieval::VectorIndex;
use raglab_memory::{FileIndex, IngestReport, Ingestor, TextSplitter};

/// Produces answers for `/chat`.
pub trait AnswerSource: Send + Sync {
    fn answer(&self, query: String) -> FragmentStream;
}

impl AnswerSource for ResponseGenerator {
    fn answer(&self, query: String) -> FragmentStream {
        self.generate(query)
    }
}

/// Backs `/ingest` and `/documents`.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn ingest(&self) -> Result<IngestReport, RetrievalError>;
    async fn sources(&self) -> Vec<String>;
}

#[async_trait]
impl KnowledgeBase for Ingestor {
    async fn ingest(&self) -> Result<IngestReport, RetrievalError> {
        Ingestor::ingest(self).await
    }

    async fn sources(&self) -> Vec<String> {
        self.list_sources().await
    }
}

/// Shared application state for the gateway.
#[derive(Clone)]
pub struct GatewayState {
    pub answers: Arc<dyn AnswerSource>,
    pub knowledge: Arc<dyn KnowledgeBase>,
}

impl GatewayState {
    /// Wire the production components from config.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let provider = raglab_providers::build_provider_from_config(config)?;
        let embedder = raglab_providers::build_embedder_from_config(config)?;
        let index: Arc<dyn VectorIndex> =
            Arc::new(FileIndex::open(&config.ingest.index_path, embedder).await);

        let retriever = Arc::new(ContextRetriever::new(index.clone(), config.retrieval.k));
        let tools = Arc::new(raglab_tools::default_registry(
            index.clone(),
            config.retrieval.detail_k,
        ));
        let generator = ResponseGenerator::new(
            provider,
            retriever,
            tools,
            GeneratorSettings::from_config(config),
        );

        let ingestor = Ingestor::new(
            index,
            TextSplitter::new(config.ingest.chunk_size, config.ingest.chunk_overlap),
            &config.ingest.data_path,
        );

        Ok(Self {
            answers: Arc::new(generator),
            knowledge: Arc::new(ingestor),
        })
    }
}

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS restricted to the configured origins
/// - Request body size limit (64 KB)
/// - HTTP trace logging
pub fn build_router(state: GatewayState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ingest", post(ingest_handler))
        .route("/documents", get(documents_handler))
        .route("/chat", post(chat_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = GatewayState::from_config(&config).await?;
    let app = build_router(state, &config.gateway.allowed_origins);

    info!(addr = %addr, model = %config.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct DocumentsResponse {
    sources: Vec<String>,
}

#[derive(Deserialize)]
struct ChatRequest {
    query: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
        .into_response()
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn ingest_handler(State(state): State<GatewayState>) -> Response {
    match state.knowledge.ingest().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!(error = %e, "Ingest failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Ingest failed: {e}"))
        }
    }
}

async fn documents_handler(State(state): State<GatewayState>) -> Json<DocumentsResponse> {
    Json(DocumentsResponse {
        sources: state.knowledge.sources().await,
    })
}

/// `POST /chat`: answer a query as `text/event-stream`.
async fn chat_handler(
    State(state): State<GatewayState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text());
        }
    };

    if request.query.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "query must not be empty");
    }

    info!(query_len = request.query.len(), "Chat request");

    let body = Body::from_stream(sse::event_stream(state.answers.answer(request.query)));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}
