pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use state::AppState;

/// JSON API plus the health and root endpoints. The HTML portal lives in
/// [`crate::web`]; [`crate::router`] puts the two together.
pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Auth routes
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))

        .nest("/api", api_routes(app_state.clone()))

        .with_state(app_state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(renter_routes(state.clone()))
        .nest("/admin", admin_routes(state))
}

fn renter_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/media", get(handlers::media::list).post(handlers::media::save))
        .route("/media/:id", get(handlers::media::get))
        .route("/rentals", get(handlers::rentals::list).post(handlers::rentals::rent))
        .route("/rentals/:id/return", post(handlers::rentals::return_media))
        .route("/checkout", post(handlers::rentals::checkout))
        .route("/dues", get(handlers::payments::dues).post(handlers::payments::clear_dues))
        .route("/payments", get(handlers::payments::list))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/renters", get(handlers::admin::renters))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ))
}
