use askama::Template;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Extension,
};
use chrono::Utc;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    web::{
        portal::{admin_only, RentalRow},
        templates::{user_message, Flash, HtmlTemplate, PageContext},
    },
};

#[derive(Template)]
#[template(path = "admin/renters.html")]
pub struct AdminRentersTemplate {
    pub page: PageContext,
    pub renters: Vec<RenterRow>,
}

pub struct RenterRow {
    pub name: String,
    pub email: String,
    pub rentals: Vec<RentalRow>,
}

pub async fn renters_page(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(flash): Query<Flash>,
) -> Response {
    if let Some(redirect) = admin_only(&current_user) {
        return redirect;
    }

    let mut page = PageContext::new(&state, Some(&current_user.user), flash);
    let ledger = &state.service_context.rental_ledger;
    let now = Utc::now();

    let renters = match state.service_context.user_service.list_renters().await {
        Ok(renters) => renters
            .into_iter()
            .map(|activity| RenterRow {
                name: activity.user.name.clone(),
                email: activity.user.email.clone(),
                rentals: activity.rentals
                    .iter()
                    .map(|r| RentalRow::new(r, ledger, now))
                    .collect(),
            })
            .collect(),
        Err(e) => {
            page = page.with_error(user_message(&e));
            Vec::new()
        }
    };

    HtmlTemplate(AdminRentersTemplate { page, renters }).into_response()
}
