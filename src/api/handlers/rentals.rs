use axum::{
    extract::{Path, State, Extension},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{PaymentMethod, RentalRecord, Transaction},
    error::{AppError, Result},
    service::Checkout,
};

#[derive(Debug, Deserialize)]
pub struct RentRequest {
    pub media_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub media_ids: Vec<Uuid>,
    pub payment_method: PaymentMethod,
}

pub async fn rent(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<RentRequest>,
) -> Result<(StatusCode, Json<Transaction>)> {
    let transaction = state.service_context.rental_ledger
        .rent(current_user.user.id, req.media_id)
        .await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Vec<RentalRecord>>> {
    let rentals = state.service_context.rental_ledger
        .transactions_for(current_user.user.id)
        .await?;

    Ok(Json(rentals))
}

pub async fn return_media(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>> {
    let transaction = state.service_context.transaction_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

    // Only the renter (or an admin) may close a rental
    if transaction.user_id != current_user.user.id && !current_user.user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let returned = state.service_context.rental_ledger.return_media(id).await?;

    Ok(Json(returned))
}

pub async fn checkout(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Checkout>)> {
    let checkout = state.service_context.rental_ledger
        .checkout(current_user.user.id, &req.media_ids, req.payment_method)
        .await?;

    Ok((StatusCode::CREATED, Json(checkout)))
}
