use std::sync::Arc;
use serde::Serialize;
use validator::Validate;

use crate::{
    auth::AuthService,
    domain::*,
    error::{AppError, Result},
    repository::UserRepository,
};
use super::rental_ledger::RentalLedger;

/// A renter and everything they have borrowed, for the admin overview.
#[derive(Debug, Clone, Serialize)]
pub struct RenterActivity {
    pub user: User,
    pub rentals: Vec<RentalRecord>,
}

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    ledger: Arc<RentalLedger>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, ledger: Arc<RentalLedger>) -> Self {
        Self { repo, ledger }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<User> {
        request.validate()?;

        if request.password != request.confirm_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }

        let email = request.email.trim().to_lowercase();

        // Check for duplicate email
        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("A user already exists with this email".to_string()));
        }

        let user = self.repo
            .create(CreateUserRequest {
                name: request.name.trim().to_string(),
                email,
                password: request.password,
                role: Role::User,
            })
            .await?;

        tracing::info!("Registered user {} ({})", user.email, user.id);

        Ok(user)
    }

    /// The user behind `email` if `password` matches, `None` otherwise.
    pub async fn verify_login(&self, email: &str, password: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();

        let Some(hash) = self.repo.find_password_hash(&email).await? else {
            return Ok(None);
        };

        if !AuthService::verify_password(password, &hash).await? {
            return Ok(None);
        }

        self.repo.find_by_email(&email).await
    }

    pub async fn list_renters(&self) -> Result<Vec<RenterActivity>> {
        let users = self.repo.list_by_role(Role::User).await?;

        let mut renters = Vec::with_capacity(users.len());
        for user in users {
            let rentals = self.ledger.transactions_for(user.id).await?;
            renters.push(RenterActivity { user, rentals });
        }

        Ok(renters)
    }
}
