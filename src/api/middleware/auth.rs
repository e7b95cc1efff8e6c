use axum::{
    body::Body,
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::{
    api::state::AppState,
    auth::{session::Session, SESSION_COOKIE},
    domain::User,
    error::{AppError, Result},
};

pub const CSRF_HEADER: &str = "x-csrf-token";

/// Largest form body the CSRF check will buffer.
const MAX_FORM_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
}

#[derive(Clone)]
pub struct SessionInfo {
    pub session_id: String,
}

#[derive(Deserialize)]
struct CsrfForm {
    csrf_token: Option<String>,
}

async fn authenticate(state: &AppState, jar: &CookieJar) -> Result<Option<(Session, User)>> {
    let Some(session_cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    let Some(session) = state.service_context.auth_service
        .validate_session(session_cookie.value())
        .await?
    else {
        return Ok(None);
    };

    let user = state.service_context.user_repo
        .find_by_id(session.user_id)
        .await?;

    Ok(user.map(|user| (session, user)))
}

fn attach(request: &mut Request, session: Session, user: User) {
    request.extensions_mut().insert(SessionInfo { session_id: session.id });
    request.extensions_mut().insert(CurrentUser { user });
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let (session, user) = authenticate(&state, &jar)
        .await?
        .ok_or(AppError::Unauthorized)?;

    attach(&mut request, session, user);

    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let (session, user) = authenticate(&state, &jar)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }

    attach(&mut request, session, user);

    Ok(next.run(request).await)
}

/// Like `require_auth`, but sends browsers to the login page instead of
/// answering with an error.
pub async fn require_auth_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, &jar).await {
        Ok(Some((session, user))) => {
            attach(&mut request, session, user);
            next.run(request).await
        }
        Ok(None) => Redirect::to("/login").into_response(),
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            Redirect::to("/login").into_response()
        }
    }
}

/// Reject state-changing requests that do not carry the session's CSRF token,
/// either in the `X-CSRF-Token` header or a `csrf_token` form field.
/// Must run after one of the auth middlewares.
pub async fn require_csrf(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method();
    if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
        return next.run(request).await;
    }

    let Some(session_id) = request
        .extensions()
        .get::<SessionInfo>()
        .map(|s| s.session_id.clone())
    else {
        return AppError::Unauthorized.into_response();
    };

    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (token, request) = match header_token {
        Some(token) => (Some(token), request),
        None => {
            // Buffer the form body to read the token, then hand it on untouched
            let (parts, body) = request.into_parts();
            let bytes = match axum::body::to_bytes(body, MAX_FORM_BYTES).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    return AppError::BadRequest("Request body too large".to_string()).into_response();
                }
            };
            let token = serde_urlencoded::from_bytes::<CsrfForm>(&bytes)
                .ok()
                .and_then(|form| form.csrf_token);
            (token, Request::from_parts(parts, Body::from(bytes)))
        }
    };

    let verified = state.service_context.csrf_service
        .verify(&session_id, token.as_deref())
        .await;

    if let Err(e) = verified {
        tracing::warn!("Rejected {} {} with missing or stale CSRF token", request.method(), request.uri().path());
        return e.into_response();
    }

    next.run(request).await
}
