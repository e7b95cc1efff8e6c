use axum::{extract::State, Json};

use crate::{
    api::state::AppState,
    error::Result,
    service::RenterActivity,
};

pub async fn renters(State(state): State<AppState>) -> Result<Json<Vec<RenterActivity>>> {
    let renters = state.service_context.user_service.list_renters().await?;
    Ok(Json(renters))
}
