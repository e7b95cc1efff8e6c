use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use mediashelf::{
    api::state::AppState,
    auth::SessionLength,
    config::Settings,
    domain::{CreateUserRequest, MediaForm, Role, User},
    service::ServiceContext,
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    ctx: Arc<ServiceContext>,
}

async fn spawn_app() -> anyhow::Result<TestApp> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    let settings = Arc::new(Settings::default());
    let ctx = Arc::new(ServiceContext::new(pool, &settings));
    let router = mediashelf::router(AppState::new(ctx.clone(), settings));

    Ok(TestApp { router, ctx })
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> anyhow::Result<Response> {
        Ok(self.router.clone().oneshot(request).await?)
    }

    async fn user(&self, email: &str, role: Role) -> anyhow::Result<User> {
        Ok(self.ctx.user_repo.create(CreateUserRequest {
            name: "Test User".to_string(),
            email: email.to_string(),
            password: "password".to_string(),
            role,
        }).await?)
    }

    /// Returns the session cookie header value and the session id.
    async fn login(&self, user: &User) -> anyhow::Result<(String, String)> {
        let (session, token) = self.ctx.auth_service.create_session(user.id, SessionLength::Standard).await?;
        Ok((format!("session={}", token), session.id))
    }

    async fn media(&self, title: &str) -> anyhow::Result<uuid::Uuid> {
        let media = self.ctx.catalog_service.save(MediaForm {
            media_id: None,
            title: title.to_string(),
            description: format!("{} description", title),
            link: "https://example.com/sample.pdf".to_string(),
            media_type: "Book".to_string(),
            category: "Action".to_string(),
            rent_per_day: "3.00".to_string(),
        }).await?;
        Ok(media.id)
    }
}

fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn form_request(uri: &str, cookie: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn body_json(response: Response) -> anyhow::Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let app = spawn_app().await?;

    let response = app.send(get("/health", None)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?["status"], "healthy");

    Ok(())
}

#[tokio::test]
async fn test_api_requires_session() -> anyhow::Result<()> {
    let app = spawn_app().await?;

    let response = app.send(get("/api/rentals", None)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(get("/api/rentals", Some("session=bogus"))).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_login_sets_session_cookie() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    app.user("demo@app.com", Role::User).await?;

    let bad = app.send(json_request(
        Method::POST,
        "/auth/login",
        None,
        json!({ "email": "demo@app.com", "password": "nope" }),
    )).await?;
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);

    let ok = app.send(json_request(
        Method::POST,
        "/auth/login",
        None,
        json!({ "email": "demo@app.com", "password": "password" }),
    )).await?;
    assert_eq!(ok.status(), StatusCode::OK);

    let cookie = ok.headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    Ok(())
}

#[tokio::test]
async fn test_rent_and_return_over_api() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let user = app.user("demo@app.com", Role::User).await?;
    let other = app.user("other@app.com", Role::User).await?;
    let (cookie, _) = app.login(&user).await?;
    let (other_cookie, _) = app.login(&other).await?;
    let media_id = app.media("Good Omens").await?;

    let rented = app.send(json_request(
        Method::POST,
        "/api/rentals",
        Some(&cookie),
        json!({ "media_id": media_id }),
    )).await?;
    assert_eq!(rented.status(), StatusCode::CREATED);
    let rented = body_json(rented).await?;
    assert_eq!(rented["amount_cents"], 300);
    assert_eq!(rented["payment_status"], "Unpaid");
    let id = rented["id"].as_str().unwrap_or_default().to_string();

    let return_uri = format!("/api/rentals/{}/return", id);

    let stolen = app.send(json_request(Method::POST, &return_uri, Some(&other_cookie), json!({}))).await?;
    assert_eq!(stolen.status(), StatusCode::FORBIDDEN);

    let returned = app.send(json_request(Method::POST, &return_uri, Some(&cookie), json!({}))).await?;
    assert_eq!(returned.status(), StatusCode::OK);
    let returned = body_json(returned).await?;
    assert_eq!(returned["amount_cents"], 300);
    assert!(returned["returned_at"].is_string());

    let dues = body_json(app.send(get("/api/dues", Some(&cookie))).await?).await?;
    assert_eq!(dues["total_due_cents"], 300);

    let paid = app.send(json_request(
        Method::POST,
        "/api/dues",
        Some(&cookie),
        json!({ "payment_method": "Cash", "amount_cents": 300 }),
    )).await?;
    assert_eq!(paid.status(), StatusCode::CREATED);
    let paid = body_json(paid).await?;
    assert_eq!(paid["amount_cents"], 300);
    assert_eq!(paid["allocations"].as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn test_media_writes_are_admin_only() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let user = app.user("demo@app.com", Role::User).await?;
    let admin = app.user("admin@app.com", Role::Admin).await?;
    let (user_cookie, _) = app.login(&user).await?;
    let (admin_cookie, _) = app.login(&admin).await?;

    let body = json!({
        "title": "The Martian",
        "description": "Andy Weir - The Martian",
        "link": "https://example.com/martian.pdf",
        "media_type": "Book",
        "category": "Sci-Fi",
        "rent_per_day": "3.00"
    });

    let denied = app.send(json_request(Method::POST, "/api/media", Some(&user_cookie), body.clone())).await?;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let created = app.send(json_request(Method::POST, "/api/media", Some(&admin_cookie), body)).await?;
    assert_eq!(created.status(), StatusCode::OK);

    let listed = body_json(app.send(get("/api/media", Some(&user_cookie))).await?).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let renters = app.send(get("/api/admin/renters", Some(&user_cookie))).await?;
    assert_eq!(renters.status(), StatusCode::FORBIDDEN);

    let renters = app.send(get("/api/admin/renters", Some(&admin_cookie))).await?;
    assert_eq!(renters.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_portal_redirects_by_role() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let user = app.user("demo@app.com", Role::User).await?;
    let admin = app.user("admin@app.com", Role::Admin).await?;
    let (user_cookie, _) = app.login(&user).await?;
    let (admin_cookie, _) = app.login(&admin).await?;

    let anonymous = app.send(get("/portal", None)).await?;
    assert!(anonymous.status().is_redirection());
    assert_eq!(location(&anonymous), "/login");

    let dashboard = app.send(get("/portal", Some(&user_cookie))).await?;
    assert_eq!(dashboard.status(), StatusCode::OK);

    let admin_on_user_page = app.send(get("/portal/library", Some(&admin_cookie))).await?;
    assert_eq!(location(&admin_on_user_page), "/portal/admin");

    let user_on_admin_page = app.send(get("/portal/admin/media", Some(&user_cookie))).await?;
    assert_eq!(location(&user_on_admin_page), "/portal");

    let admin_page = app.send(get("/portal/admin", Some(&admin_cookie))).await?;
    assert_eq!(admin_page.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_portal_posts_require_csrf_token() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let user = app.user("demo@app.com", Role::User).await?;
    let (cookie, session_id) = app.login(&user).await?;
    let media_id = app.media("Jungle Book").await?;

    let body = format!("media_id={}", media_id);

    let missing = app.send(form_request("/portal/library/rent", &cookie, &body)).await?;
    assert_eq!(missing.status(), StatusCode::FORBIDDEN);

    let wrong = app.send(form_request(
        "/portal/library/rent",
        &cookie,
        &format!("csrf_token=forged&{}", body),
    )).await?;
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);
    assert!(app.ctx.rental_ledger.transactions_for(user.id).await?.is_empty());

    let token = app.ctx.csrf_service.generate_token(&session_id).await?;
    let accepted = app.send(form_request(
        "/portal/library/rent",
        &cookie,
        &format!("csrf_token={}&{}", token, body),
    )).await?;
    assert!(accepted.status().is_redirection());
    assert!(location(&accepted).starts_with("/portal?notice="));
    assert_eq!(app.ctx.rental_ledger.transactions_for(user.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_logout_ends_session_and_csrf_token() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let user = app.user("demo@app.com", Role::User).await?;
    let (cookie, session_id) = app.login(&user).await?;

    // A newer token replaces the one handed out before it
    let first = app.ctx.csrf_service.generate_token(&session_id).await?;
    let token = app.ctx.csrf_service.generate_token(&session_id).await?;
    assert!(!app.ctx.csrf_service.is_valid(&session_id, &first).await?);
    assert!(app.ctx.csrf_service.is_valid(&session_id, &token).await?);

    let logout = app.send(form_request("/logout", &cookie, "")).await?;
    assert_eq!(location(&logout), "/login");

    assert!(!app.ctx.csrf_service.is_valid(&session_id, &token).await?);
    let dashboard = app.send(get("/portal", Some(&cookie))).await?;
    assert_eq!(location(&dashboard), "/login");

    Ok(())
}

#[tokio::test]
async fn test_portal_checkout_and_dues() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let user = app.user("demo@app.com", Role::User).await?;
    let (cookie, session_id) = app.login(&user).await?;
    let a = app.media("The Martian").await?;
    let b = app.media("Good Omens").await?;
    let token = app.ctx.csrf_service.generate_token(&session_id).await?;

    let checkout = app.send(form_request(
        "/portal/checkout",
        &cookie,
        &format!("csrf_token={}&media_id={}&media_id={}&payment_method=DebitCard", token, a, b),
    )).await?;
    assert!(checkout.status().is_redirection());
    assert!(location(&checkout).starts_with("/portal?notice="));

    let rentals = app.ctx.rental_ledger.transactions_for(user.id).await?;
    assert_eq!(rentals.len(), 2);
    assert!(rentals.iter().all(|r| r.transaction.paid_cents == 300));

    // Everything is prepaid, so there is nothing to clear
    let dues = app.send(form_request(
        "/portal/dues",
        &cookie,
        &format!("csrf_token={}&amount=5.00&payment_method=Cash", token),
    )).await?;
    assert!(location(&dues).starts_with("/portal?error="));

    let payments = app.ctx.rental_ledger.payments_for(user.id).await?;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount_cents, 600);

    Ok(())
}

#[tokio::test]
async fn test_card_payments_need_valid_card_details() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let user = app.user("demo@app.com", Role::User).await?;
    let (cookie, session_id) = app.login(&user).await?;
    let media_id = app.media("Good Omens").await?;
    let token = app.ctx.csrf_service.generate_token(&session_id).await?;

    let rented = app.ctx.rental_ledger.rent(user.id, media_id).await?;
    app.ctx.rental_ledger.return_media_at(rented.id, rented.borrowed_at).await?;

    let no_card = app.send(json_request(
        Method::POST,
        "/api/dues",
        Some(&cookie),
        json!({ "payment_method": "CreditCard", "amount_cents": 300 }),
    )).await?;
    assert_eq!(no_card.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let short_number = app.send(form_request(
        "/portal/dues",
        &cookie,
        &format!(
            "csrf_token={}&amount=3.00&payment_method=CreditCard&card_number=4242&card_expiry=2027-08&card_cvv=123",
            token
        ),
    )).await?;
    assert!(location(&short_number).starts_with("/portal?error="));
    assert!(app.ctx.rental_ledger.payments_for(user.id).await?.is_empty());

    let paid = app.send(form_request(
        "/portal/dues",
        &cookie,
        &format!(
            "csrf_token={}&amount=3.00&payment_method=CreditCard&card_number=4242+4242+4242+4242&card_expiry=2027-08&card_cvv=123",
            token
        ),
    )).await?;
    assert!(location(&paid).starts_with("/portal/payments?notice="));
    assert_eq!(app.ctx.rental_ledger.dues_summary(user.id).await?.total_due_cents, 0);

    Ok(())
}
