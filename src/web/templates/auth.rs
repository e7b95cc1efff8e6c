use askama::Template;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::{
    api::state::AppState,
    auth::{AuthService, SessionLength, SESSION_COOKIE},
    domain::{RegisterUserRequest, User},
    error::Result,
    web::templates::{user_message, Flash, HtmlTemplate, PageContext},
};

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
}

#[derive(Template)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember_me: Option<String>,
}

/// Where a freshly signed-in user lands.
pub fn home_for(user: &User) -> &'static str {
    if user.is_admin() { "/portal/admin" } else { "/portal" }
}

// GET /login
pub async fn login_page(
    State(state): State<AppState>,
    Query(flash): Query<Flash>,
) -> impl IntoResponse {
    HtmlTemplate(LoginTemplate {
        page: PageContext::new(&state, None, flash),
        email: String::new(),
    })
}

// POST /login
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match state.service_context.user_service
        .verify_login(&form.email, &form.password)
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!("Failed login for {}", form.email);
            return HtmlTemplate(LoginTemplate {
                page: PageContext::new(&state, None, Flash::default())
                    .with_error("No user found with that email and password"),
                email: form.email,
            }).into_response();
        }
        Err(e) => {
            return HtmlTemplate(LoginTemplate {
                page: PageContext::new(&state, None, Flash::default())
                    .with_error(user_message(&e)),
                email: form.email,
            }).into_response();
        }
    };

    let length = if form.remember_me.is_some() {
        SessionLength::RememberMe
    } else {
        SessionLength::Standard
    };

    match start_session(&state, jar, &user, length).await {
        Ok(jar) => (jar, Redirect::to(home_for(&user))).into_response(),
        Err(e) => HtmlTemplate(LoginTemplate {
            page: PageContext::new(&state, None, Flash::default())
                .with_error(user_message(&e)),
            email: form.email,
        }).into_response(),
    }
}

// GET /register
pub async fn register_page(State(state): State<AppState>) -> impl IntoResponse {
    HtmlTemplate(RegisterTemplate {
        page: PageContext::new(&state, None, Flash::default()),
        name: String::new(),
        email: String::new(),
    })
}

// POST /register
pub async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterUserRequest>,
) -> Response {
    let name = form.name.clone();
    let email = form.email.clone();

    let result = match state.service_context.user_service.register(form).await {
        Ok(user) => start_session(&state, jar, &user, SessionLength::Standard).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(jar) => (jar, Redirect::to("/portal")).into_response(),
        Err(e) => HtmlTemplate(RegisterTemplate {
            page: PageContext::new(&state, None, Flash::default())
                .with_error(user_message(&e)),
            name,
            email,
        }).into_response(),
    }
}

// POST /logout
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        let ctx = &state.service_context;
        if let Err(e) = ctx.auth_service.sign_out(session_cookie.value(), &ctx.csrf_service).await {
            tracing::warn!("Failed to end session on logout: {}", e);
        }
    }

    (jar.add(AuthService::logout_cookie()), Redirect::to("/login"))
}

async fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
    length: SessionLength,
) -> Result<CookieJar> {
    let (_session, cookie) = state.service_context.auth_service
        .sign_in(user.id, length)
        .await?;

    Ok(jar.add(cookie))
}
