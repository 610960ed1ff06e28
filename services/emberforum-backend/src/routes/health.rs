use axum::http::status::StatusCode;
use axum::response::IntoResponse;

/// GET handler for health checks
#[allow(clippy::unused_async)]
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}
