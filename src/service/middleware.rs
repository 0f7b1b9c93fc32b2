//! Service middleware for request metrics.
//!
//! ## Metrics Exposed
//!
//! - `request` - Request count and latency by path, method, status
//! - `table_served` - Bytes served per export table

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

/// Metrics middleware that records request counts and latency.
///
/// Metrics are emitted as structured log events on the
/// `alluvial_kernel::metrics` target.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "alluvial_kernel::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Record one served export file.
pub fn record_table_served(file_name: &str, bytes: usize) {
    info!(
        target: "alluvial_kernel::metrics",
        metric_type = "table_served",
        file = file_name,
        bytes = bytes,
        "table_served_metric"
    );
}
