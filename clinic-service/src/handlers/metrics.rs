use axum::response::IntoResponse;

/// Prometheus exposition endpoint.
pub async fn metrics() -> impl IntoResponse {
    crate::services::metrics::get_metrics()
}
