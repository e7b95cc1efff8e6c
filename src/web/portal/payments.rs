use std::collections::HashMap;

use askama::Template;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Extension,
};
use uuid::Uuid;

use crate::{
    api::{
        middleware::auth::CurrentUser,
        state::AppState,
    },
    domain::Payment,
    error::Result,
    web::templates::{format_cents, user_message, Flash, HtmlTemplate, PageContext},
};
use super::{format_date, renter_only};

#[derive(Template)]
#[template(path = "portal/payments.html")]
pub struct PaymentsTemplate {
    pub page: PageContext,
    pub payments: Vec<PaymentRow>,
    pub total_paid: String,
}

pub struct PaymentRow {
    pub date: String,
    pub amount: String,
    pub method: String,
    /// Titles the payment was applied to.
    pub items: String,
}

pub async fn payments_page(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(flash): Query<Flash>,
) -> Response {
    if let Some(redirect) = renter_only(&current_user) {
        return redirect;
    }

    let mut page = PageContext::new(&state, Some(&current_user.user), flash);

    let payments = match payment_rows(&state, current_user.user.id).await {
        Ok(rows) => rows,
        Err(e) => {
            page = page.with_error(user_message(&e));
            Vec::new()
        }
    };

    let total: i64 = payments.iter().map(|(p, _)| p.amount_cents).sum();

    HtmlTemplate(PaymentsTemplate {
        page,
        payments: payments.into_iter().map(|(_, row)| row).collect(),
        total_paid: format_cents(total),
    }).into_response()
}

async fn payment_rows(state: &AppState, user_id: Uuid) -> Result<Vec<(Payment, PaymentRow)>> {
    let ctx = &state.service_context;

    let titles: HashMap<Uuid, String> = ctx.rental_ledger
        .transactions_for(user_id)
        .await?
        .into_iter()
        .map(|r| (r.transaction.id, r.media.title))
        .collect();

    let mut rows = Vec::new();
    for payment in ctx.rental_ledger.payments_for(user_id).await? {
        let items = ctx.payment_repo
            .find_allocations(payment.id)
            .await?
            .iter()
            .filter_map(|a| titles.get(&a.transaction_id).cloned())
            .collect::<Vec<_>>()
            .join(", ");

        let row = PaymentRow {
            date: format_date(payment.created_at),
            amount: format_cents(payment.amount_cents),
            method: payment.method.label().to_string(),
            items,
        };
        rows.push((payment, row));
    }

    Ok(rows)
}
