pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod repository;
pub mod service;
pub mod web;

use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};

use api::state::AppState;

/// The whole application: JSON API, HTML portal and static assets.
pub fn router(state: AppState) -> Router {
    api::create_app(state.clone())
        .merge(web::create_web_routes(state))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
