use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Parameterized route; every id shares the `/users/:id` series.
pub async fn get_user(Path(id): Path<u64>) -> impl IntoResponse {
    if id == 0 {
        return (StatusCode::NOT_FOUND, "no such user".to_string());
    }
    (StatusCode::OK, format!("user {id}"))
}

/// Always answers 503, to see error statuses on the dashboard.
pub async fn fail() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
}
