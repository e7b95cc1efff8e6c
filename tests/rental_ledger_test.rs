use std::sync::Arc;

use chrono::{Duration, Utc};
use mediashelf::{
    domain::{CreateUserRequest, MediaType, PaymentMethod, PaymentStatus, Role, SaveMediaRequest, User, Media},
    error::AppError,
    repository::*,
    service::rental_ledger::RentalLedger,
};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

struct Fixture {
    pool: SqlitePool,
    ledger: RentalLedger,
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaRepository>,
    transactions: Arc<dyn TransactionRepository>,
    payments: Arc<dyn PaymentRepository>,
}

async fn setup() -> anyhow::Result<Fixture> {
    // One connection, or every checkout would see its own empty in-memory db
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    let users: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(pool.clone()));
    let media: Arc<dyn MediaRepository> = Arc::new(SqliteMediaRepository::new(pool.clone()));
    let transactions: Arc<dyn TransactionRepository> = Arc::new(SqliteTransactionRepository::new(pool.clone()));
    let payments: Arc<dyn PaymentRepository> = Arc::new(SqlitePaymentRepository::new(pool.clone()));

    let ledger = RentalLedger::new(
        users.clone(),
        media.clone(),
        transactions.clone(),
        payments.clone(),
        7,
    );

    Ok(Fixture { pool, ledger, users, media, transactions, payments })
}

impl Fixture {
    async fn user(&self, email: &str) -> anyhow::Result<User> {
        Ok(self.users.create(CreateUserRequest {
            name: "Demo User".to_string(),
            email: email.to_string(),
            password: "password".to_string(),
            role: Role::User,
        }).await?)
    }

    async fn media(&self, title: &str, rent_per_day_cents: i64) -> anyhow::Result<Media> {
        Ok(self.media.create(SaveMediaRequest {
            title: title.to_string(),
            description: format!("{} description", title),
            link: "https://example.com/sample.pdf".to_string(),
            media_type: MediaType::Book,
            categories: vec!["Action".to_string()],
            rent_per_day_cents,
        }).await?)
    }

    async fn count(&self, table: &str) -> anyhow::Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?)
    }
}

#[tokio::test]
async fn test_rent_creates_unpaid_transaction_with_link() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;
    let book = fx.media("The Martian", 300).await?;

    let transaction = fx.ledger.rent(user.id, book.id).await?;

    assert_eq!(transaction.amount_cents, 300);
    assert_eq!(transaction.paid_cents, 0);
    assert_eq!(transaction.payment_status, PaymentStatus::Unpaid);
    assert!(transaction.returned_at.is_none());

    let link = fx.transactions.find_link_by_transaction(transaction.id).await?;
    let link = link.expect("rental should have a share link");
    assert!(!link.expired);
    assert_eq!(link.token.len(), 64);

    Ok(())
}

#[tokio::test]
async fn test_rent_unknown_media_is_not_found() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;

    let result = fx.ledger.rent(user.id, Uuid::new_v4()).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(fx.count("transactions").await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_return_unknown_transaction_is_not_found() -> anyhow::Result<()> {
    let fx = setup().await?;

    let result = fx.ledger.return_media(Uuid::new_v4()).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_return_after_two_days_charges_three_days() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;
    let book = fx.media("Good Omens", 300).await?;

    let rented = fx.ledger.rent(user.id, book.id).await?;
    let returned = fx.ledger
        .return_media_at(rented.id, rented.borrowed_at + Duration::days(2))
        .await?;

    assert_eq!(returned.amount_cents, 900);
    assert_eq!(returned.paid_cents, 0);
    assert_eq!(returned.payment_status, PaymentStatus::Unpaid);
    assert!(returned.returned_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_same_day_return_charges_one_day() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;
    let book = fx.media("Jungle Book", 3).await?;

    let rented = fx.ledger.rent(user.id, book.id).await?;
    let returned = fx.ledger.return_media_at(rented.id, rented.borrowed_at).await?;

    assert_eq!(returned.amount_cents, 3);
    assert!(returned.amount_cents >= 0);

    Ok(())
}

#[tokio::test]
async fn test_returning_twice_is_rejected() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;
    let book = fx.media("Jungle Book", 300).await?;

    let rented = fx.ledger.rent(user.id, book.id).await?;
    fx.ledger.return_media(rented.id).await?;

    let again = fx.ledger.return_media(rented.id).await;
    assert!(matches!(again, Err(AppError::Validation(_))));

    Ok(())
}

#[tokio::test]
async fn test_clear_dues_applies_credit_in_order() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;
    let first = fx.media("First", 3).await?;
    let second = fx.media("Second", 4).await?;

    let t1 = fx.ledger.rent(user.id, first.id).await?;
    let t2 = fx.ledger.rent(user.id, second.id).await?;
    fx.ledger.return_media_at(t1.id, t1.borrowed_at).await?;
    fx.ledger.return_media_at(t2.id, t2.borrowed_at).await?;

    let payment = fx.ledger.clear_dues(user.id, PaymentMethod::CreditCard, 5).await?;
    assert_eq!(payment.amount_cents, 5);
    assert_eq!(payment.method, PaymentMethod::CreditCard);

    let t1 = fx.transactions.find_by_id(t1.id).await?.expect("first transaction");
    let t2 = fx.transactions.find_by_id(t2.id).await?.expect("second transaction");

    assert_eq!(t1.paid_cents, 3);
    assert_eq!(t1.payment_status, PaymentStatus::Paid);
    assert_eq!(t2.paid_cents, 2);
    assert_eq!(t2.payment_status, PaymentStatus::Unpaid);

    let allocations = fx.payments.find_allocations(payment.id).await?;
    let applied: Vec<(Uuid, i64)> = allocations.iter().map(|a| (a.transaction_id, a.amount_cents)).collect();
    assert_eq!(applied.len(), 2);
    assert!(applied.contains(&(t1.id, 3)));
    assert!(applied.contains(&(t2.id, 2)));

    Ok(())
}

#[tokio::test]
async fn test_clear_dues_never_overpays() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;
    let book = fx.media("Good Omens", 300).await?;

    let rented = fx.ledger.rent(user.id, book.id).await?;
    fx.ledger.return_media_at(rented.id, rented.borrowed_at + Duration::days(1)).await?;

    // 600 due, 10_000 offered
    let payment = fx.ledger.clear_dues(user.id, PaymentMethod::Cash, 10_000).await?;
    assert_eq!(payment.amount_cents, 600);

    for t in fx.transactions.find_by_user(user.id).await? {
        assert!(t.paid_cents <= t.amount_cents);
        assert_eq!(t.payment_status, PaymentStatus::Paid);
    }

    // Nothing left to pay
    let again = fx.ledger.clear_dues(user.id, PaymentMethod::Cash, 100).await;
    assert!(matches!(again, Err(AppError::Validation(_))));

    Ok(())
}

#[tokio::test]
async fn test_clear_dues_rejects_bad_input() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;

    let no_transactions = fx.ledger.clear_dues(user.id, PaymentMethod::Cash, 100).await;
    assert!(matches!(no_transactions, Err(AppError::NotFound(_))));

    let book = fx.media("Good Omens", 300).await?;
    fx.ledger.rent(user.id, book.id).await?;

    for amount in [0, -5] {
        let result = fx.ledger.clear_dues(user.id, PaymentMethod::Cash, amount).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
    assert_eq!(fx.count("payments").await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_checkout_prepays_every_item() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;
    let a = fx.media("The Martian", 300).await?;
    let b = fx.media("Good Omens", 250).await?;

    let checkout = fx.ledger
        .checkout(user.id, &[a.id, b.id], PaymentMethod::DebitCard)
        .await?;

    assert_eq!(checkout.transactions.len(), 2);
    for t in &checkout.transactions {
        assert_eq!(t.paid_cents, t.amount_cents);
        assert_eq!(t.payment_status, PaymentStatus::Paid);
    }

    let payment = checkout.payment.expect("checkout should record a payment");
    assert_eq!(payment.amount_cents, 550);
    assert_eq!(fx.payments.find_allocations(payment.id).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_checkout_with_unknown_media_writes_nothing() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;
    let a = fx.media("The Martian", 300).await?;

    let result = fx.ledger
        .checkout(user.id, &[a.id, Uuid::new_v4()], PaymentMethod::Cash)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(fx.count("transactions").await?, 0);
    assert_eq!(fx.count("links").await?, 0);
    assert_eq!(fx.count("payments").await?, 0);

    let empty = fx.ledger.checkout(user.id, &[], PaymentMethod::Cash).await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    Ok(())
}

#[tokio::test]
async fn test_share_link_stops_resolving_after_return() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;
    let other = fx.user("other@app.com").await?;
    let book = fx.media("The Fault in Our Stars", 300).await?;

    let rented = fx.ledger.rent(user.id, book.id).await?;
    let token = fx.transactions
        .find_link_by_transaction(rented.id)
        .await?
        .expect("share link")
        .token;

    let shared = fx.ledger.open_shared(user.id, &token).await?;
    assert_eq!(shared.map(|m| m.id), Some(book.id));

    // Someone else's token does not open
    assert!(fx.ledger.open_shared(other.id, &token).await?.is_none());
    assert!(fx.ledger.open_shared(user.id, "not-a-token").await?.is_none());

    fx.ledger.return_media(rented.id).await?;

    assert!(fx.ledger.open_shared(user.id, &token).await?.is_none());
    let link = fx.transactions.find_link_by_transaction(rented.id).await?.expect("share link");
    assert!(link.expired);

    Ok(())
}

#[tokio::test]
async fn test_dues_summary_totals_returned_rentals() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;
    let a = fx.media("A", 100).await?;
    let b = fx.media("B", 200).await?;
    let c = fx.media("C", 500).await?;

    let ta = fx.ledger.rent(user.id, a.id).await?;
    let tb = fx.ledger.rent(user.id, b.id).await?;
    fx.ledger.rent(user.id, c.id).await?;

    fx.ledger.return_media_at(ta.id, ta.borrowed_at + Duration::days(1)).await?; // 200
    fx.ledger.return_media_at(tb.id, tb.borrowed_at).await?; // 200
    fx.ledger.clear_dues(user.id, PaymentMethod::Cash, 250).await?;

    let summary = fx.ledger.dues_summary(user.id).await?;

    assert_eq!(summary.rented.len(), 1);
    assert_eq!(summary.rented[0].media.title, "C");
    assert_eq!(summary.returned.len(), 2);
    assert_eq!(summary.total_billed_cents, 400);
    assert_eq!(summary.total_due_cents, 150);

    let payments = fx.ledger.payments_for(user.id).await?;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount_cents, 250);

    Ok(())
}

#[tokio::test]
async fn test_paying_the_total_due_clears_it() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;
    let kept = fx.media("The Martian", 300).await?;
    let back = fx.media("Good Omens", 300).await?;

    // Rented first and still out, so it sits ahead of the returned one
    let out = fx.ledger.rent(user.id, kept.id).await?;
    let returned = fx.ledger.rent(user.id, back.id).await?;
    fx.ledger.return_media_at(returned.id, returned.borrowed_at).await?;

    let due = fx.ledger.dues_summary(user.id).await?.total_due_cents;
    assert_eq!(due, 300);

    fx.ledger.clear_dues(user.id, PaymentMethod::Cash, due).await?;

    assert_eq!(fx.ledger.dues_summary(user.id).await?.total_due_cents, 0);
    let still_out = fx.transactions.find_by_id(out.id).await?.expect("rental exists");
    assert_eq!(still_out.paid_cents, 0);
    assert_eq!(still_out.payment_status, PaymentStatus::Unpaid);

    // Only the active rental is left, and it is not due until it comes back
    let nothing_due = fx.ledger.clear_dues(user.id, PaymentMethod::Cash, 300).await;
    assert!(matches!(nothing_due, Err(AppError::Validation(_))));

    Ok(())
}

#[tokio::test]
async fn test_overdue_after_return_window() -> anyhow::Result<()> {
    let fx = setup().await?;
    let user = fx.user("demo@app.com").await?;
    let book = fx.media("Good Omens", 300).await?;

    let rented = fx.ledger.rent(user.id, book.id).await?;

    assert_eq!(fx.ledger.due_back_by(rented.borrowed_at), rented.borrowed_at + Duration::days(7));
    assert!(!fx.ledger.is_overdue(&rented, Utc::now()));
    assert!(fx.ledger.is_overdue(&rented, rented.borrowed_at + Duration::days(8)));

    let returned = fx.ledger.return_media(rented.id).await?;
    assert!(!fx.ledger.is_overdue(&returned, returned.borrowed_at + Duration::days(30)));

    Ok(())
}
