use chrono::Utc;
use sqlx::SqlitePool;

use super::{generate_token, hash_token};
use crate::error::{AppError, Result};

/// One CSRF token per session, stored hashed. Rendering a portal page issues a
/// fresh token and the previous one stops working.
pub struct CsrfService {
    pool: SqlitePool,
}

impl CsrfService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn generate_token(&self, session_id: &str) -> Result<String> {
        let token = generate_token();

        sqlx::query(
            r#"
            INSERT INTO csrf_tokens (session_id, token_hash, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(session_id) DO UPDATE SET
                token_hash = excluded.token_hash,
                created_at = excluded.created_at
            "#
        )
        .bind(session_id)
        .bind(hash_token(&token))
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    pub async fn is_valid(&self, session_id: &str, token: &str) -> Result<bool> {
        let stored = sqlx::query_scalar::<_, String>(
            "SELECT token_hash FROM csrf_tokens WHERE session_id = ?"
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stored.is_some_and(|hash| hash == hash_token(token)))
    }

    /// `Forbidden` unless `token` is the session's current CSRF token.
    pub async fn verify(&self, session_id: &str, token: Option<&str>) -> Result<()> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Err(AppError::Forbidden);
        };

        if self.is_valid(session_id, token).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub async fn delete_token(&self, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM csrf_tokens WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
