mod admin;
mod dashboard;
mod library;
mod payments;
mod share;

use axum::{
    Router,
    routing::{get, post},
    middleware,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};

use crate::{
    api::{middleware::auth::{CurrentUser, SessionInfo}, state::AppState},
    domain::{PaymentMethod, RentalRecord},
    service::rental_ledger::RentalLedger,
    web::templates::format_cents,
};

pub fn create_portal_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Renter routes
        .route("/", get(dashboard::dashboard_page))
        .route("/rentals/:id/return", post(dashboard::return_rental))
        .route("/dues", post(dashboard::clear_dues))
        .route("/library", get(library::library_page))
        .route("/library/rent", post(library::rent))
        .route("/checkout", post(library::checkout))
        .route("/payments", get(payments::payments_page))
        .route("/share/:token", get(share::share_page))

        // Admin routes
        .route("/admin", get(admin::renters::renters_page))
        .route("/admin/media", get(admin::media::media_page).post(admin::media::save_media))
        .route("/admin/categories", post(admin::media::add_category))

        // CSRF protection for state-changing requests (runs after auth)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::api::middleware::auth::require_csrf,
        ))
        // Require authentication for all portal routes (runs first)
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::api::middleware::auth::require_auth_redirect,
        ))
}

/// Renter pages send admins to their own overview.
pub fn renter_only(current_user: &CurrentUser) -> Option<Response> {
    current_user.user.is_admin()
        .then(|| Redirect::to("/portal/admin").into_response())
}

/// Admin pages send everyone else back to their dashboard.
pub fn admin_only(current_user: &CurrentUser) -> Option<Response> {
    (!current_user.user.is_admin())
        .then(|| Redirect::to("/portal").into_response())
}

/// Fresh CSRF token for the forms on a page.
pub async fn csrf_token(state: &AppState, session: &SessionInfo) -> String {
    state.service_context.csrf_service
        .generate_token(&session.session_id)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to issue CSRF token: {}", e);
            String::new()
        })
}

pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%B %d, %Y").to_string()
}

pub struct MethodOption {
    pub value: &'static str,
    pub label: &'static str,
}

pub fn payment_methods() -> Vec<MethodOption> {
    PaymentMethod::ALL
        .into_iter()
        .map(|m| MethodOption { value: m.as_str(), label: m.label() })
        .collect()
}

/// A rental as shown in the dashboard and admin tables.
pub struct RentalRow {
    pub id: String,
    pub title: String,
    pub media_type: String,
    pub borrowed_at: String,
    pub returned_at: String,
    pub due_back: String,
    pub overdue: bool,
    pub amount: String,
    pub paid: String,
    pub pending: String,
    pub status: String,
    pub share_url: Option<String>,
}

impl RentalRow {
    pub fn new(record: &RentalRecord, ledger: &RentalLedger, now: DateTime<Utc>) -> Self {
        let transaction = &record.transaction;

        let share_url = record.link
            .as_ref()
            .filter(|link| !link.expired && !transaction.is_returned())
            .map(|link| format!("/portal/share/{}", link.token));

        Self {
            id: transaction.id.to_string(),
            title: record.media.title.clone(),
            media_type: record.media.media_type.as_str().to_string(),
            borrowed_at: format_date(transaction.borrowed_at),
            returned_at: transaction.returned_at.map(format_date).unwrap_or_default(),
            due_back: format_date(ledger.due_back_by(transaction.borrowed_at)),
            overdue: ledger.is_overdue(transaction, now),
            amount: format_cents(transaction.amount_cents),
            paid: format_cents(transaction.paid_cents),
            pending: format_cents(transaction.pending_cents()),
            status: transaction.payment_status.as_str().to_string(),
            share_url,
        }
    }
}
