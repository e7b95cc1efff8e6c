use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::{
    auth::generate_token,
    domain::{Link, NewTransaction, PaymentStatus, Transaction},
    error::{AppError, Result},
    repository::TransactionRepository,
};

#[derive(FromRow)]
struct TransactionRow {
    id: String,
    user_id: String,
    media_id: String,
    borrowed_at: NaiveDateTime,
    returned_at: Option<NaiveDateTime>,
    amount_cents: i64,
    paid_cents: i64,
    payment_status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct LinkRow {
    id: String,
    transaction_id: String,
    token: String,
    expired: i32,
    created_at: NaiveDateTime,
}

pub struct SqliteTransactionRepository {
    pool: SqlitePool,
}

impl SqliteTransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_transaction(row: TransactionRow) -> Result<Transaction> {
        Ok(Transaction {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            user_id: Uuid::parse_str(&row.user_id).map_err(|e| AppError::Database(e.to_string()))?,
            media_id: Uuid::parse_str(&row.media_id).map_err(|e| AppError::Database(e.to_string()))?,
            borrowed_at: DateTime::from_naive_utc_and_offset(row.borrowed_at, Utc),
            returned_at: row.returned_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            amount_cents: row.amount_cents,
            paid_cents: row.paid_cents,
            payment_status: PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
                AppError::Database(format!("Invalid payment status: {}", row.payment_status))
            })?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_link(row: LinkRow) -> Result<Link> {
        Ok(Link {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            transaction_id: Uuid::parse_str(&row.transaction_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            token: row.token,
            expired: row.expired != 0,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    async fn fetch(&self, id: Uuid, context: &str) -> Result<Transaction> {
        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database(format!("Failed to retrieve {} transaction", context))
        })
    }
}

#[async_trait]
impl TransactionRepository for SqliteTransactionRepository {
    async fn create(&self, transaction: NewTransaction) -> Result<Transaction> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let status = PaymentStatus::for_balance(transaction.amount_cents, transaction.paid_cents);

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user_id, media_id, borrowed_at, returned_at,
                amount_cents, paid_cents, payment_status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, NULL, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(transaction.user_id.to_string())
        .bind(transaction.media_id.to_string())
        .bind(transaction.borrowed_at.naive_utc())
        .bind(transaction.amount_cents)
        .bind(transaction.paid_cents)
        .bind(status.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.fetch(id, "created").await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, user_id, media_id, borrowed_at, returned_at,
                   amount_cents, paid_cents, payment_status, created_at, updated_at
            FROM transactions
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_transaction(r)?)),
            None => Ok(None)
        }
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, user_id, media_id, borrowed_at, returned_at,
                   amount_cents, paid_cents, payment_status, created_at, updated_at
            FROM transactions
            WHERE user_id = ?
            ORDER BY rowid ASC
            "#
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_transaction)
            .collect()
    }

    async fn mark_returned(
        &self,
        id: Uuid,
        returned_at: DateTime<Utc>,
        amount_cents: i64,
        status: PaymentStatus,
    ) -> Result<Transaction> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET returned_at = ?,
                amount_cents = ?,
                payment_status = ?,
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(returned_at.naive_utc())
        .bind(amount_cents)
        .bind(status.as_str())
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.fetch(id, "returned").await
    }

    async fn update_paid(&self, id: Uuid, paid_cents: i64, status: PaymentStatus) -> Result<Transaction> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET paid_cents = ?,
                payment_status = ?,
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(paid_cents)
        .bind(status.as_str())
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.fetch(id, "updated").await
    }

    async fn create_link(&self, transaction_id: Uuid) -> Result<Link> {
        let id = Uuid::new_v4();
        let token = generate_token();

        sqlx::query(
            r#"
            INSERT INTO links (id, transaction_id, token, expired, created_at)
            VALUES (?, ?, ?, 0, ?)
            "#
        )
        .bind(id.to_string())
        .bind(transaction_id.to_string())
        .bind(&token)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_link_by_token(&token).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created link".to_string())
        })
    }

    async fn find_link_by_transaction(&self, transaction_id: Uuid) -> Result<Option<Link>> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, transaction_id, token, expired, created_at
            FROM links
            WHERE transaction_id = ?
            "#
        )
        .bind(transaction_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_link).transpose()
    }

    async fn find_link_by_token(&self, token: &str) -> Result<Option<Link>> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, transaction_id, token, expired, created_at
            FROM links
            WHERE token = ?
            "#
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_link).transpose()
    }

    async fn expire_link(&self, transaction_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE links SET expired = 1 WHERE transaction_id = ?")
            .bind(transaction_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
