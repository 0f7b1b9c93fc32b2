//! Axum routes for the export service.

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::export::{AlluvialLinkRow, AlluvialNodeRow, EdgeRow, NodeRow, TableRow};
use crate::pipeline::RUN_MANIFEST_FILE;
use crate::ALLUVIAL_SCHEMA_VERSION;

use super::middleware::{metrics_middleware, record_table_served};
use super::state::ServiceState;

// ============================================================================
// Response Types
// ============================================================================

/// Endpoint index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    /// Service name.
    pub service: String,
    /// Available endpoints.
    pub endpoints: Vec<String>,
}

/// Service health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` when every table exists, `degraded` otherwise.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Export schema version.
    pub schema_version: String,
    /// Directory being served.
    pub export_dir: String,
    /// Export files that are missing.
    pub missing: Vec<String>,
}

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip)]
    status: u16,
}

impl ErrorResponse {
    /// Create a new error response with status, code and message.
    pub fn new(status: StatusCode, code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
            status: status.as_u16(),
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// HTTP status of the error.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        tracing::warn!(
            code = %self.code,
            error = %self.error,
            details = ?self.details,
            "Request error"
        );
        (self.status(), Json(self)).into_response()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

const EXPORT_FILES: [&str; 5] = [
    NodeRow::FILE_NAME,
    EdgeRow::FILE_NAME,
    AlluvialNodeRow::FILE_NAME,
    AlluvialLinkRow::FILE_NAME,
    RUN_MANIFEST_FILE,
];

async fn read_export_file(
    state: &ServiceState,
    file_name: &'static str,
    content_type: &'static str,
) -> Result<Response, ErrorResponse> {
    let path = state.file_path(file_name);
    let body = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ErrorResponse::new(
                StatusCode::NOT_FOUND,
                "TABLE_NOT_FOUND",
                format!("{} has not been exported", file_name),
            )
        } else {
            ErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "READ_FAILED",
                format!("Failed to read {}", file_name),
            )
            .with_details(e.to_string())
        }
    })?;

    record_table_served(file_name, body.len());

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response())
}

async fn csv_table<R: TableRow>(state: &ServiceState) -> Result<Response, ErrorResponse> {
    read_export_file(state, R::FILE_NAME, "text/csv; charset=utf-8").await
}

async fn index_handler() -> Json<IndexResponse> {
    Json(IndexResponse {
        service: "alluvial-kernel".to_string(),
        endpoints: [
            "/health",
            "/data/nodes",
            "/data/edges",
            "/data/alluvial-nodes",
            "/data/alluvial-links",
            "/data/manifest",
        ]
        .iter()
        .map(|e| e.to_string())
        .collect(),
    })
}

/// Health check endpoint.
///
/// Reports which export files are missing; never fails.
async fn health_handler(State(state): State<ServiceState>) -> Json<HealthResponse> {
    let mut missing = Vec::new();
    for file in EXPORT_FILES {
        if !tokio::fs::try_exists(state.file_path(file)).await.unwrap_or(false) {
            missing.push(file.to_string());
        }
    }

    Json(HealthResponse {
        status: if missing.is_empty() { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: ALLUVIAL_SCHEMA_VERSION.to_string(),
        export_dir: state.export_dir().display().to_string(),
        missing,
    })
}

async fn nodes_handler(State(state): State<ServiceState>) -> Result<Response, ErrorResponse> {
    csv_table::<NodeRow>(&state).await
}

async fn edges_handler(State(state): State<ServiceState>) -> Result<Response, ErrorResponse> {
    csv_table::<EdgeRow>(&state).await
}

async fn alluvial_nodes_handler(
    State(state): State<ServiceState>,
) -> Result<Response, ErrorResponse> {
    csv_table::<AlluvialNodeRow>(&state).await
}

async fn alluvial_links_handler(
    State(state): State<ServiceState>,
) -> Result<Response, ErrorResponse> {
    csv_table::<AlluvialLinkRow>(&state).await
}

async fn manifest_handler(State(state): State<ServiceState>) -> Result<Response, ErrorResponse> {
    read_export_file(&state, RUN_MANIFEST_FILE, "application/json").await
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the export service.
pub fn create_router(state: ServiceState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/data/nodes", get(nodes_handler))
        .route("/data/edges", get(edges_handler))
        .route("/data/alluvial-nodes", get(alluvial_nodes_handler))
        .route("/data/alluvial-links", get(alluvial_links_handler))
        .route("/data/manifest", get(manifest_handler))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state)
}
