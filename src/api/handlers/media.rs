use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{Media, MediaForm},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Media>>> {
    let media = state.service_context.catalog_service
        .search(&params.q)
        .await?;

    Ok(Json(media))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Media>> {
    let media = state.service_context.catalog_service.find(id).await?;
    Ok(Json(media))
}

/// Create or update, keyed by the optional `media_id` field. Admins only.
pub async fn save(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(form): Json<MediaForm>,
) -> Result<Json<Media>> {
    if !current_user.user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let media = state.service_context.catalog_service.save(form).await?;
    Ok(Json(media))
}
