//! Prometheus metrics endpoint and HTTP request tracking middleware.
//!
//! - `GET /metrics` renders Prometheus text format
//! - middleware records request counts and durations per matched route
//! - catalog gauges are refreshed from the database on each scrape

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::db::StoreStats;
use crate::AppState;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const CATALOG_WRITES_TOTAL: &str = "catalog_writes_total";
pub const PRODUCTS_TOTAL: &str = "products_total";
pub const CATEGORIES_TOTAL: &str = "categories_total";

/// Install the global Prometheus recorder. Call once at startup.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(
        CATALOG_WRITES_TOTAL,
        "Admin catalog writes by entity and operation"
    );
    describe_gauge!(PRODUCTS_TOTAL, "Number of products in the catalog");
    describe_gauge!(CATEGORIES_TOTAL, "Number of categories in the catalog");

    Ok(handle)
}

/// GET /metrics
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics_handle.as_ref() {
        Some(handle) => {
            if let Ok(stats) = StoreStats::collect(&state.db).await {
                gauge!(PRODUCTS_TOTAL).set(stats.total_products as f64);
                gauge!(CATEGORIES_TOTAL).set(stats.active_categories as f64);
            }
            (StatusCode::OK, handle.render())
        }
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Middleware recording `http_requests_total` and `http_request_duration_seconds`
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    // Matched route template (e.g. /api/products/:key) keeps label cardinality bounded
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

/// Count a successful admin write, e.g. `record_catalog_write("product", "create")`
pub fn record_catalog_write(entity: &'static str, operation: &'static str) {
    counter!(CATALOG_WRITES_TOTAL, "entity" => entity, "operation" => operation).increment(1);
}
