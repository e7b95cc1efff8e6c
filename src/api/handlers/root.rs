use axum::{http::StatusCode, Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "MediaShelf API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Rent books, movies and music by the day",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "auth": "/auth/login",
            "media": "/api/media",
            "rentals": "/api/rentals",
            "dues": "/api/dues",
            "payments": "/api/payments",
            "portal": "/portal"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
