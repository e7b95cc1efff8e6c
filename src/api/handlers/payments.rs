use axum::{
    extract::{State, Extension},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{CardDetails, DuesSummary, Payment, PaymentAllocation, PaymentMethod},
    error::Result,
};

#[derive(Debug, Deserialize)]
pub struct ClearDuesRequest {
    pub payment_method: PaymentMethod,
    pub amount_cents: i64,
    /// Required for card payments.
    #[serde(default)]
    pub card: Option<CardDetails>,
}

#[derive(Debug, Serialize)]
pub struct PaymentDto {
    #[serde(flatten)]
    pub payment: Payment,
    pub allocations: Vec<PaymentAllocation>,
}

pub async fn dues(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<DuesSummary>> {
    let summary = state.service_context.rental_ledger
        .dues_summary(current_user.user.id)
        .await?;

    Ok(Json(summary))
}

pub async fn clear_dues(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<ClearDuesRequest>,
) -> Result<(StatusCode, Json<PaymentDto>)> {
    req.payment_method.check_card(req.card.as_ref())?;

    let payment = state.service_context.rental_ledger
        .clear_dues(current_user.user.id, req.payment_method, req.amount_cents)
        .await?;

    let allocations = state.service_context.payment_repo
        .find_allocations(payment.id)
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentDto { payment, allocations })))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Vec<PaymentDto>>> {
    let payments = state.service_context.rental_ledger
        .payments_for(current_user.user.id)
        .await?;

    let mut dtos = Vec::with_capacity(payments.len());
    for payment in payments {
        let allocations = state.service_context.payment_repo
            .find_allocations(payment.id)
            .await?;
        dtos.push(PaymentDto { payment, allocations });
    }

    Ok(Json(dtos))
}
