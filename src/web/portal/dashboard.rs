use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Extension, Form,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{
        middleware::auth::{CurrentUser, SessionInfo},
        state::AppState,
    },
    domain::{CardDetails, Payment, PaymentMethod},
    error::{AppError, Result},
    web::templates::{
        format_cents, parse_amount, redirect_with_error, redirect_with_notice,
        user_message, Flash, HtmlTemplate, PageContext,
    },
};
use super::{csrf_token, payment_methods, renter_only, MethodOption, RentalRow};

#[derive(Template)]
#[template(path = "portal/dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub csrf_token: String,
    pub rented: Vec<RentalRow>,
    pub returned: Vec<RentalRow>,
    pub total_billed: String,
    pub total_due: String,
    /// Prefill for the pay-dues amount field, e.g. `9.00`.
    pub total_due_input: String,
    pub has_dues: bool,
    pub payment_methods: Vec<MethodOption>,
}

#[derive(Debug, Deserialize)]
pub struct ClearDuesForm {
    pub amount: String,
    pub payment_method: String,
    #[serde(flatten)]
    pub card: CardDetails,
}

pub async fn dashboard_page(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Extension(session): Extension<SessionInfo>,
    Query(flash): Query<Flash>,
) -> Response {
    if let Some(redirect) = renter_only(&current_user) {
        return redirect;
    }

    let ledger = &state.service_context.rental_ledger;
    let mut page = PageContext::new(&state, Some(&current_user.user), flash);

    let summary = match ledger.dues_summary(current_user.user.id).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            page = page.with_error(user_message(&e));
            None
        }
    };

    let now = Utc::now();
    let (rented, returned, billed, due) = match summary {
        Some(s) => (
            s.rented.iter().map(|r| RentalRow::new(r, ledger, now)).collect(),
            s.returned.iter().map(|r| RentalRow::new(r, ledger, now)).collect(),
            s.total_billed_cents,
            s.total_due_cents,
        ),
        None => (Vec::new(), Vec::new(), 0, 0),
    };

    HtmlTemplate(DashboardTemplate {
        page,
        csrf_token: csrf_token(&state, &session).await,
        rented,
        returned,
        total_billed: format_cents(billed),
        total_due: format_cents(due),
        total_due_input: format!("{}.{:02}", due / 100, due % 100),
        has_dues: due > 0,
        payment_methods: payment_methods(),
    }).into_response()
}

pub async fn return_rental(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Response {
    match return_own_rental(&state, &current_user, id).await {
        Ok(title) => redirect_with_notice("/portal", &format!("Returned {}", title)).into_response(),
        Err(e) => redirect_with_error("/portal", &e).into_response(),
    }
}

async fn return_own_rental(state: &AppState, current_user: &CurrentUser, id: Uuid) -> Result<String> {
    let records = state.service_context.rental_ledger
        .transactions_for(current_user.user.id)
        .await?;

    let record = records
        .into_iter()
        .find(|r| r.transaction.id == id)
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

    state.service_context.rental_ledger.return_media(id).await?;

    Ok(record.media.title)
}

pub async fn clear_dues(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Form(form): Form<ClearDuesForm>,
) -> Response {
    match pay_dues(&state, &current_user, &form).await {
        Ok(payment) => redirect_with_notice(
            "/portal/payments",
            &format!("Paid {}", format_cents(payment.amount_cents)),
        ).into_response(),
        Err(e) => redirect_with_error("/portal", &e).into_response(),
    }
}

async fn pay_dues(state: &AppState, current_user: &CurrentUser, form: &ClearDuesForm) -> Result<Payment> {
    let amount_cents = parse_amount(&form.amount)?;
    let method = PaymentMethod::parse(&form.payment_method)
        .ok_or_else(|| AppError::Validation("Choose a payment method".to_string()))?;
    method.check_card(Some(&form.card))?;

    state.service_context.rental_ledger
        .clear_dues(current_user.user.id, method, amount_cents)
        .await
}
