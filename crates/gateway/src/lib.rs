//! PaperCast API Gateway
//!
//! HTTP surface over the paper pipeline.
//! Handles:
//! - Paper ingestion by upload, URL, DOI, academic page and search
//! - Paper listing and lookup
//! - Topic synthesis
//! - Media serving
//! - Observability (request ids, tracing, metrics)

pub mod handlers;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use papercast_common::{config::AppConfig, db::DbPool};
use papercast_ingestion::Pipeline;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub pipeline: Pipeline,
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let media = ServeDir::new(state.pipeline.media().root());
    let body_limit = DefaultBodyLimit::max(state.config.server.max_upload_bytes);

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Ingestion endpoints
        .route("/upload/", post(handlers::ingest::upload))
        .route("/process-url/", post(handlers::ingest::process_url))
        .route("/process-doi/", post(handlers::ingest::process_doi))
        .route("/process-academic-url/", post(handlers::ingest::process_academic_url))
        .route("/search/", get(handlers::search::search))

        // Paper endpoints
        .route("/papers/", get(handlers::papers::list_papers))
        .route("/papers/{id}/", get(handlers::papers::get_paper))

        // Synthesis endpoints
        .route("/synthesize/", get(handlers::synthesis::synthesize))

        .nest_service("/media", media)
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}
