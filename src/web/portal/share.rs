use askama::Template;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Extension,
};

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    web::templates::{redirect_with_error, Flash, HtmlTemplate, PageContext},
};

#[derive(Template)]
#[template(path = "portal/share.html")]
pub struct ShareTemplate {
    pub page: PageContext,
    pub title: String,
    pub description: String,
    pub link: String,
}

/// Open a rented item through its share token. Unknown, expired or foreign
/// tokens go back to the dashboard.
pub async fn share_page(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(token): Path<String>,
) -> Response {
    match state.service_context.rental_ledger
        .open_shared(current_user.user.id, &token)
        .await
    {
        Ok(Some(media)) => HtmlTemplate(ShareTemplate {
            page: PageContext::new(&state, Some(&current_user.user), Flash::default()),
            title: media.title,
            description: media.description,
            link: media.link,
        }).into_response(),
        Ok(None) => Redirect::to("/portal").into_response(),
        Err(e) => redirect_with_error("/portal", &e).into_response(),
    }
}
