pub mod auth;

use askama::Template;
use axum::{
    response::{Html, IntoResponse, Redirect, Response},
    http::StatusCode,
};
use serde::Deserialize;

pub use crate::domain::parse_amount;

use crate::{
    api::state::AppState,
    domain::User,
    error::AppError,
};

/// Data the base layout needs on every page.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub app_name: String,
    pub current_user: Option<UserInfo>,
    pub is_admin: bool,
    pub notice: Option<String>,
    pub error: Option<String>,
}

impl PageContext {
    pub fn new(state: &AppState, user: Option<&User>, flash: Flash) -> Self {
        Self {
            app_name: state.settings.site.app_name.clone(),
            current_user: user.map(UserInfo::from),
            is_admin: user.map(User::is_admin).unwrap_or(false),
            notice: flash.notice,
            error: flash.error,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// One-shot messages carried across a POST/redirect/GET in the query string.
#[derive(Debug, Default, Deserialize)]
pub struct Flash {
    pub notice: Option<String>,
    pub error: Option<String>,
}

pub fn redirect_with_notice(path: &str, message: &str) -> Redirect {
    redirect_with(path, "notice", message)
}

pub fn redirect_with_error(path: &str, error: &AppError) -> Redirect {
    redirect_with(path, "error", &user_message(error))
}

fn redirect_with(path: &str, key: &str, message: &str) -> Redirect {
    match serde_urlencoded::to_string([(key, message)]) {
        Ok(query) => Redirect::to(&format!("{}?{}", path, query)),
        Err(_) => Redirect::to(path),
    }
}

/// What to tell the person at the browser. Server-side failures stay vague.
pub fn user_message(error: &AppError) -> String {
    match error {
        AppError::NotFound(msg)
        | AppError::BadRequest(msg)
        | AppError::Conflict(msg)
        | AppError::Validation(msg) => msg.clone(),
        AppError::Unauthorized => "Please sign in again".to_string(),
        AppError::Forbidden => "You are not allowed to do that".to_string(),
        AppError::Database(_) | AppError::Internal(_) => {
            tracing::error!("Portal request failed: {}", error);
            "Something went wrong, please try again".to_string()
        }
    }
}

/// `1250` -> `"$12.50"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{}${}.{:02}", sign, cents / 100, cents % 100)
}

// Make askama templates work with axum
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            ).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_cents_as_dollars() {
        assert_eq!(format_cents(0), "$0.00");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(900), "$9.00");
        assert_eq!(format_cents(123_456), "$1234.56");
    }

    #[test]
    fn parses_amounts_without_rounding() {
        assert_eq!(parse_amount("12").unwrap(), 1200);
        assert_eq!(parse_amount("12.5").unwrap(), 1250);
        assert_eq!(parse_amount(" $0.07 ").unwrap(), 7);
        assert_eq!(parse_amount(".5").unwrap(), 50);
    }

    #[test]
    fn rejects_malformed_amounts() {
        for input in ["", "abc", "1.234", "-3", "1,00", "."] {
            assert!(parse_amount(input).is_err(), "{input:?} should be rejected");
        }
    }
}
