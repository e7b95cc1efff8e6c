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
    domain::{Media, MediaForm, MediaType},
    error::Result,
    web::{
        portal::{admin_only, csrf_token},
        templates::{
            format_cents, redirect_with_error, redirect_with_notice, user_message,
            Flash, HtmlTemplate, PageContext,
        },
    },
};

#[derive(Template)]
#[template(path = "admin/media.html")]
pub struct AdminMediaTemplate {
    pub page: PageContext,
    pub csrf_token: String,
    pub items: Vec<MediaListing>,
    pub categories: Vec<String>,
    pub form: MediaFormView,
}

pub struct MediaListing {
    pub id: String,
    pub title: String,
    pub media_type: String,
    pub categories: String,
    pub rent: String,
}

/// Values shown in the add/edit form.
pub struct MediaFormView {
    pub editing: bool,
    pub media_id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub category: String,
    pub rent_per_day: String,
    pub types: Vec<TypeOption>,
}

pub struct TypeOption {
    pub value: &'static str,
    pub selected: bool,
}

impl MediaFormView {
    fn blank() -> Self {
        Self {
            editing: false,
            media_id: String::new(),
            title: String::new(),
            description: String::new(),
            link: String::new(),
            category: String::new(),
            rent_per_day: String::new(),
            types: type_options(None),
        }
    }

    fn for_media(media: &Media) -> Self {
        let cents = media.rent_per_day_cents;
        Self {
            editing: true,
            media_id: media.id.to_string(),
            title: media.title.clone(),
            description: media.description.clone(),
            link: media.link.clone(),
            category: media.categories.join(", "),
            rent_per_day: format!("{}.{:02}", cents / 100, cents % 100),
            types: type_options(Some(media.media_type)),
        }
    }
}

fn type_options(selected: Option<MediaType>) -> Vec<TypeOption> {
    MediaType::ALL
        .into_iter()
        .map(|t| TypeOption { value: t.as_str(), selected: Some(t) == selected })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct MediaPageQuery {
    pub edit: Option<Uuid>,
    #[serde(flatten)]
    pub flash: Flash,
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

pub async fn media_page(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Extension(session): Extension<SessionInfo>,
    Query(query): Query<MediaPageQuery>,
) -> Response {
    if let Some(redirect) = admin_only(&current_user) {
        return redirect;
    }

    let mut page = PageContext::new(&state, Some(&current_user.user), query.flash);

    let (items, categories, form) = match load_catalog(&state, query.edit).await {
        Ok(loaded) => loaded,
        Err(e) => {
            page = page.with_error(user_message(&e));
            (Vec::new(), Vec::new(), MediaFormView::blank())
        }
    };

    HtmlTemplate(AdminMediaTemplate {
        page,
        csrf_token: csrf_token(&state, &session).await,
        items,
        categories,
        form,
    }).into_response()
}

async fn load_catalog(
    state: &AppState,
    edit: Option<Uuid>,
) -> Result<(Vec<MediaListing>, Vec<String>, MediaFormView)> {
    let catalog = &state.service_context.catalog_service;

    let media = catalog.list().await?;
    let categories = catalog
        .list_categories()
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();

    let form = edit
        .and_then(|id| media.iter().find(|m| m.id == id))
        .map(MediaFormView::for_media)
        .unwrap_or_else(MediaFormView::blank);

    let items = media
        .iter()
        .map(|m| MediaListing {
            id: m.id.to_string(),
            title: m.title.clone(),
            media_type: m.media_type.as_str().to_string(),
            categories: m.categories.join(", "),
            rent: format_cents(m.rent_per_day_cents),
        })
        .collect();

    Ok((items, categories, form))
}

pub async fn save_media(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Form(form): Form<MediaForm>,
) -> Response {
    if let Some(redirect) = admin_only(&current_user) {
        return redirect;
    }

    match state.service_context.catalog_service.save(form).await {
        Ok(media) => redirect_with_notice("/portal/admin/media", &format!("Saved {}", media.title)).into_response(),
        Err(e) => redirect_with_error("/portal/admin/media", &e).into_response(),
    }
}

pub async fn add_category(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Form(form): Form<CategoryForm>,
) -> Response {
    if let Some(redirect) = admin_only(&current_user) {
        return redirect;
    }

    match state.service_context.catalog_service.add_category(&form.name).await {
        Ok(category) => redirect_with_notice(
            "/portal/admin/media",
            &format!("Added category {}", category.name),
        ).into_response(),
        Err(e) => redirect_with_error("/portal/admin/media", &e).into_response(),
    }
}
