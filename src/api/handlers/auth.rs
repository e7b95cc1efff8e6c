use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    api::state::AppState,
    auth::{AuthService, SessionLength, SESSION_COOKIE},
    domain::Role,
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub role: Role,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let user = state.service_context.user_service
        .verify_login(&req.email, &req.password)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let (_session, cookie) = state.service_context.auth_service
        .sign_in(user.id, SessionLength::Standard)
        .await?;

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Login successful".to_string(),
            role: user.role,
        })
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        let ctx = &state.service_context;
        ctx.auth_service
            .sign_out(session_cookie.value(), &ctx.csrf_service)
            .await?;
    }

    let jar = jar.add(AuthService::logout_cookie());

    Ok((jar, StatusCode::NO_CONTENT))
}
