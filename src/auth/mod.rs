use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::{SaltString, rand_core::OsRng};
use chrono::{Duration, Utc};
use cookie::{Cookie, SameSite};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AppError, Result},
};

pub mod csrf;
pub mod session;

use session::{Session, SessionStore};
pub use csrf::CsrfService;

pub const SESSION_COOKIE: &str = "session";

/// How long a new session should last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLength {
    Standard,
    /// "Remember me" on the login form.
    RememberMe,
}

/// Owns the session table and the cookie that carries a session token.
pub struct AuthService {
    session_store: SessionStore,
    standard: Duration,
    remember_me: Duration,
    secure_cookies: bool,
}

impl AuthService {
    pub fn new(pool: SqlitePool, config: &AuthConfig) -> Self {
        Self {
            session_store: SessionStore::new(pool),
            standard: Duration::hours(config.session_duration_hours),
            remember_me: Duration::days(config.remember_me_days),
            secure_cookies: config.secure_cookies,
        }
    }

    pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok())
    }

    pub async fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    pub fn lifetime(&self, length: SessionLength) -> Duration {
        match length {
            SessionLength::Standard => self.standard,
            SessionLength::RememberMe => self.remember_me,
        }
    }

    /// Store a new session and return it with its plain token. Only the
    /// token's hash is persisted.
    pub async fn create_session(&self, user_id: Uuid, length: SessionLength) -> Result<(Session, String)> {
        let token = generate_token();
        let expires_at = Utc::now() + self.lifetime(length);

        let session = self.session_store
            .create(user_id, &token, expires_at)
            .await?;

        Ok((session, token))
    }

    /// Start a session for `user_id` and build the cookie that carries it.
    /// The cookie expires together with the session.
    pub async fn sign_in(&self, user_id: Uuid, length: SessionLength) -> Result<(Session, Cookie<'static>)> {
        let (session, token) = self.create_session(user_id, length).await?;
        let cookie = self.session_cookie(&token, length);

        tracing::info!("User {} signed in ({:?} session)", user_id, length);

        Ok((session, cookie))
    }

    pub async fn validate_session(&self, token: &str) -> Result<Option<Session>> {
        self.session_store.find_by_token(token).await
    }

    /// End the session behind `token` along with its CSRF token. Unknown or
    /// expired tokens are ignored.
    pub async fn sign_out(&self, token: &str, csrf: &CsrfService) -> Result<()> {
        if let Some(session) = self.session_store.find_by_token(token).await? {
            csrf.delete_token(&session.id).await?;
            tracing::info!("User {} signed out", session.user_id);
        }

        self.session_store.delete_by_token(token).await
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64> {
        self.session_store.cleanup_expired().await
    }

    pub fn session_cookie(&self, token: &str, length: SessionLength) -> Cookie<'static> {
        let max_age = cookie::time::Duration::seconds(self.lifetime(length).num_seconds());

        Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .secure(self.secure_cookies)
            .max_age(max_age)
            .build()
    }

    pub fn logout_cookie() -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(cookie::time::Duration::seconds(0))
            .build()
    }
}

/// 32 random bytes, hex encoded. Used for session tokens and share links.
pub fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub(crate) fn hash_token(token: &str) -> String {
    use sha2::{Sha256, Digest};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation() {
        let token = generate_token();
        assert_eq!(token.len(), 64); // 32 bytes = 64 hex chars
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_token_hashing() {
        let token = "test_token";
        let hash1 = hash_token(token);
        let hash2 = hash_token(token);
        assert_eq!(hash1, hash2);
        assert_ne!(hash1, token);
    }

    fn config() -> AuthConfig {
        AuthConfig {
            session_duration_hours: 24,
            remember_me_days: 30,
            secure_cookies: true,
        }
    }

    #[tokio::test]
    async fn test_remember_me_outlives_standard_session() -> anyhow::Result<()> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let auth = AuthService::new(pool, &config());

        assert_eq!(auth.lifetime(SessionLength::Standard), Duration::hours(24));
        assert_eq!(auth.lifetime(SessionLength::RememberMe), Duration::days(30));

        let cookie = auth.session_cookie("token", SessionLength::RememberMe);
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::days(30)));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));

        Ok(())
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let hash = AuthService::hash_password("correct horse").await.unwrap();
        assert!(AuthService::verify_password("correct horse", &hash).await.unwrap());
        assert!(!AuthService::verify_password("battery staple", &hash).await.unwrap());
    }
}
