//! REST API server for chainscope
//!
//! Thin HTTP surface over the [`Aggregator`]. Every route answers with the
//! same envelope:
//!
//! - success: `{ "success": true, "data": ... }`
//! - failure: `{ "success": false, "message": ..., "error": ... }`
//!
//! `message` is a fixed description of the operation that failed; `error`
//! carries the diagnostic detail and is not meant for control flow.

use axum::{
    extract::{Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::aggregator::{Aggregator, EpochInfo, LatestSnapshot, RecentBlock, RecentEpoch};
use crate::block::Block;
use crate::error::ExplorerError;
use crate::transaction::Transaction;

const LATEST_BLOCK_FAILED: &str = "Error fetching latest block";
const TRANSACTION_FAILED: &str = "Error fetching transaction";
const TRANSACTION_NOT_FOUND: &str = "Transaction not found";
const SNAPSHOT_FAILED: &str = "Error fetching latest block, epoch, or slots data";
const EPOCH_INFO_FAILED: &str = "Error fetching epoch information";
const RECENT_EPOCHS_FAILED: &str = "Error fetching recent epochs";
const RECENT_BLOCKS_FAILED: &str = "Error fetching block information";
const LATEST_BLOCKS_FAILED: &str = "Error fetching blocks";

// ============================================================================
// Envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct Success<T> {
    success: bool,
    data: T,
}

impl<T> Success<T> {
    pub fn new(data: T) -> Self {
        Success {
            success: true,
            data,
        }
    }
}

type ApiResult<T> = Result<Json<Success<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(Success::new(data)))
}

#[derive(Debug, Serialize)]
struct Failure {
    success: bool,
    message: &'static str,
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    error: String,
}

impl ApiError {
    /// Wraps an aggregator failure for the operation described by `message`.
    pub fn from_explorer(message: &'static str, err: ExplorerError) -> Self {
        let status = match &err {
            ExplorerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ExplorerError::ConsensusDisabled => StatusCode::NOT_IMPLEMENTED,
            ExplorerError::UpstreamUnavailable { .. }
            | ExplorerError::MalformedUpstreamResponse { .. }
            | ExplorerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(error = %err, status = status.as_u16(), "{}", message);

        ApiError {
            status,
            message,
            error: err.to_string(),
        }
    }

    pub fn not_found(message: &'static str, error: String) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message,
            error,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Failure {
            success: false,
            message: self.message,
            error: self.error,
        };
        (self.status, Json(body)).into_response()
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router. Consensus routes are only mounted when the
/// aggregator has a consensus client.
pub fn build_api_router(aggregator: Arc<Aggregator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![http::Method::GET, http::Method::OPTIONS])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    let mut api_routes = Router::new()
        // Execution layer
        .route("/block/latest", get(get_latest_block))
        .route("/latest-block", get(get_latest_block))
        .route("/transaction/:hash", get(get_transaction))
        .route("/latest-blocks", get(get_latest_blocks_default))
        .route("/latest-blocks/:count", get(get_latest_blocks))
        // System
        .route("/health", get(health_check));

    if aggregator.has_consensus() {
        api_routes = api_routes
            .route("/latest-block-and-epoch", get(get_latest_block_and_epoch))
            .route("/epoch-info", get(get_epoch_info))
            .route("/epochs", get(get_recent_epochs))
            .route("/blocks", get(get_recent_blocks));
    }

    Router::new()
        .nest("/api", api_routes.with_state(aggregator))
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors)
}

/// Serve the API on `addr` until the process is stopped.
pub async fn run_api_server(
    aggregator: Arc<Aggregator>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let mode = if aggregator.has_consensus() {
        "full"
    } else {
        "execution-only"
    };
    let app = build_api_router(aggregator);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, mode, "Blockchain explorer API listening");

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(aggregator): State<Arc<Aggregator>>) -> impl IntoResponse {
    let mode = if aggregator.has_consensus() {
        "full"
    } else {
        "execution-only"
    };
    Json(serde_json::json!({
        "status": "healthy",
        "mode": mode,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_latest_block(State(aggregator): State<Arc<Aggregator>>) -> ApiResult<Block> {
    aggregator
        .latest_block()
        .await
        .map_err(|e| ApiError::from_explorer(LATEST_BLOCK_FAILED, e))
        .and_then(ok)
}

async fn get_transaction(
    State(aggregator): State<Arc<Aggregator>>,
    Path(hash): Path<String>,
) -> ApiResult<Transaction> {
    match aggregator.transaction(&hash).await {
        Ok(Some(tx)) => ok(tx),
        Ok(None) => Err(ApiError::not_found(
            TRANSACTION_NOT_FOUND,
            format!("transaction {} not found", hash),
        )),
        Err(e) => Err(ApiError::from_explorer(TRANSACTION_FAILED, e)),
    }
}

async fn get_latest_block_and_epoch(
    State(aggregator): State<Arc<Aggregator>>,
) -> ApiResult<LatestSnapshot> {
    aggregator
        .latest_snapshot()
        .await
        .map_err(|e| ApiError::from_explorer(SNAPSHOT_FAILED, e))
        .and_then(ok)
}

async fn get_epoch_info(State(aggregator): State<Arc<Aggregator>>) -> ApiResult<EpochInfo> {
    aggregator
        .epoch_info()
        .await
        .map_err(|e| ApiError::from_explorer(EPOCH_INFO_FAILED, e))
        .and_then(ok)
}

async fn get_recent_epochs(
    State(aggregator): State<Arc<Aggregator>>,
) -> ApiResult<Vec<RecentEpoch>> {
    aggregator
        .recent_epochs()
        .await
        .map_err(|e| ApiError::from_explorer(RECENT_EPOCHS_FAILED, e))
        .and_then(ok)
}

async fn get_recent_blocks(
    State(aggregator): State<Arc<Aggregator>>,
) -> ApiResult<Vec<RecentBlock>> {
    aggregator
        .recent_blocks()
        .await
        .map_err(|e| ApiError::from_explorer(RECENT_BLOCKS_FAILED, e))
        .and_then(ok)
}

async fn get_latest_blocks_default(
    State(aggregator): State<Arc<Aggregator>>,
) -> ApiResult<Vec<Block>> {
    latest_blocks(&aggregator, None).await
}

/// A count that does not parse, or is zero, falls back to the default walk
/// length.
async fn get_latest_blocks(
    State(aggregator): State<Arc<Aggregator>>,
    Path(count): Path<String>,
) -> ApiResult<Vec<Block>> {
    latest_blocks(&aggregator, count.parse().ok()).await
}

async fn latest_blocks(aggregator: &Aggregator, count: Option<u64>) -> ApiResult<Vec<Block>> {
    aggregator
        .latest_blocks(count)
        .await
        .map_err(|e| ApiError::from_explorer(LATEST_BLOCKS_FAILED, e))
        .and_then(ok)
}
