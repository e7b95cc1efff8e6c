use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::{
    domain::{Payment, PaymentAllocation, PaymentMethod},
    error::{AppError, Result},
    repository::PaymentRepository,
};

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    user_id: String,
    amount_cents: i64,
    method: String,
    created_at: NaiveDateTime,
}

#[derive(FromRow)]
struct AllocationRow {
    payment_id: String,
    transaction_id: String,
    amount_cents: i64,
}

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PaymentRow) -> Result<Payment> {
        Ok(Payment {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            user_id: Uuid::parse_str(&row.user_id).map_err(|e| AppError::Database(e.to_string()))?,
            amount_cents: row.amount_cents,
            method: Self::parse_payment_method(&row.method)?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    fn parse_payment_method(s: &str) -> Result<PaymentMethod> {
        PaymentMethod::parse(s)
            .ok_or_else(|| AppError::Database(format!("Invalid payment method: {}", s)))
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn create(&self, payment: Payment) -> Result<Payment> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, user_id, amount_cents, method, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#
        )
        .bind(payment.id.to_string())
        .bind(payment.user_id.to_string())
        .bind(payment.amount_cents)
        .bind(payment.method.as_str())
        .bind(payment.created_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(payment.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created payment".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, user_id, amount_cents, method, created_at
            FROM payments
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_payment(r)?)),
            None => Ok(None)
        }
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, user_id, amount_cents, method, created_at
            FROM payments
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_payment)
            .collect()
    }

    async fn add_allocation(&self, allocation: PaymentAllocation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_allocations (payment_id, transaction_id, amount_cents)
            VALUES (?, ?, ?)
            "#
        )
        .bind(allocation.payment_id.to_string())
        .bind(allocation.transaction_id.to_string())
        .bind(allocation.amount_cents)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find_allocations(&self, payment_id: Uuid) -> Result<Vec<PaymentAllocation>> {
        let rows = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT payment_id, transaction_id, amount_cents
            FROM payment_allocations
            WHERE payment_id = ?
            ORDER BY rowid ASC
            "#
        )
        .bind(payment_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<PaymentAllocation> {
                Ok(PaymentAllocation {
                    payment_id: Uuid::parse_str(&row.payment_id)
                        .map_err(|e| AppError::Database(e.to_string()))?,
                    transaction_id: Uuid::parse_str(&row.transaction_id)
                        .map_err(|e| AppError::Database(e.to_string()))?,
                    amount_cents: row.amount_cents,
                })
            })
            .collect()
    }
}
