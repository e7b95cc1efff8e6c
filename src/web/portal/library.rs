use askama::Template;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Extension, Form,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{
        middleware::auth::{CurrentUser, SessionInfo},
        state::AppState,
    },
    domain::{Media, PaymentMethod},
    error::{AppError, Result},
    web::templates::{
        format_cents, redirect_with_error, redirect_with_notice, user_message,
        HtmlTemplate, PageContext, Flash,
    },
};
use super::{csrf_token, payment_methods, renter_only, MethodOption};

#[derive(Template)]
#[template(path = "portal/library.html")]
pub struct LibraryTemplate {
    pub page: PageContext,
    pub csrf_token: String,
    pub query: String,
    pub items: Vec<MediaCard>,
    pub payment_methods: Vec<MethodOption>,
}

pub struct MediaCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub media_type: String,
    pub categories: String,
    pub rent: String,
}

impl From<&Media> for MediaCard {
    fn from(media: &Media) -> Self {
        Self {
            id: media.id.to_string(),
            title: media.title.clone(),
            description: media.description.clone(),
            media_type: media.media_type.as_str().to_string(),
            categories: media.categories.join(", "),
            rent: format_cents(media.rent_per_day_cents),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    #[serde(default)]
    pub q: String,
    #[serde(flatten)]
    pub flash: Flash,
}

#[derive(Debug, Deserialize)]
pub struct RentForm {
    pub media_id: Uuid,
}

pub async fn library_page(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Extension(session): Extension<SessionInfo>,
    Query(query): Query<LibraryQuery>,
) -> Response {
    if let Some(redirect) = renter_only(&current_user) {
        return redirect;
    }

    let mut page = PageContext::new(&state, Some(&current_user.user), query.flash);

    let items = match state.service_context.catalog_service.search(&query.q).await {
        Ok(media) => media.iter().map(MediaCard::from).collect(),
        Err(e) => {
            page = page.with_error(user_message(&e));
            Vec::new()
        }
    };

    HtmlTemplate(LibraryTemplate {
        page,
        csrf_token: csrf_token(&state, &session).await,
        query: query.q,
        items,
        payment_methods: payment_methods(),
    }).into_response()
}

pub async fn rent(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Form(form): Form<RentForm>,
) -> Response {
    match state.service_context.rental_ledger
        .rent(current_user.user.id, form.media_id)
        .await
    {
        Ok(_) => redirect_with_notice("/portal", "Rented. Enjoy!").into_response(),
        Err(e) => redirect_with_error("/portal/library", &e).into_response(),
    }
}

/// Checkout submits one `media_id` field per selected item, which needs the
/// raw pair list rather than a struct.
pub async fn checkout(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let result = match parse_checkout(&fields) {
        Ok((media_ids, method)) => state.service_context.rental_ledger
            .checkout(current_user.user.id, &media_ids, method)
            .await,
        Err(e) => Err(e),
    };

    match result {
        Ok(checkout) => redirect_with_notice(
            "/portal",
            &format!("Rented {} item(s)", checkout.transactions.len()),
        ).into_response(),
        Err(e) => redirect_with_error("/portal/library", &e).into_response(),
    }
}

fn parse_checkout(fields: &[(String, String)]) -> Result<(Vec<Uuid>, PaymentMethod)> {
    let mut media_ids = Vec::new();
    let mut method = None;

    for (key, value) in fields {
        match key.as_str() {
            "media_id" => media_ids.push(
                Uuid::parse_str(value)
                    .map_err(|_| AppError::Validation("Invalid media id".to_string()))?,
            ),
            "payment_method" => method = PaymentMethod::parse(value),
            _ => {}
        }
    }

    let method = method
        .ok_or_else(|| AppError::Validation("Choose a payment method".to_string()))?;

    Ok((media_ids, method))
}
