pub mod templates;
pub mod portal;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::api::state::AppState;

pub fn create_web_routes(state: AppState) -> Router {
    Router::new()
        // Auth pages (web interface)
        .route("/login", get(templates::auth::login_page).post(templates::auth::login_handler))
        .route("/register", get(templates::auth::register_page).post(templates::auth::register_handler))
        .route("/logout", post(templates::auth::logout_handler))

        .nest("/portal", portal::create_portal_routes(state.clone()))

        .nest_service("/static", ServeDir::new("static"))

        .with_state(state)
}
