use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod user_repository;
pub mod media_repository;
pub mod category_repository;
pub mod transaction_repository;
pub mod payment_repository;

pub use user_repository::SqliteUserRepository;
pub use media_repository::SqliteMediaRepository;
pub use category_repository::SqliteCategoryRepository;
pub use transaction_repository::SqliteTransactionRepository;
pub use payment_repository::SqlitePaymentRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: CreateUserRequest) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_password_hash(&self, email: &str) -> Result<Option<String>>;
    async fn list_by_role(&self, role: Role) -> Result<Vec<User>>;
}

#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn create(&self, media: SaveMediaRequest) -> Result<Media>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Media>>;
    /// All media ordered by title.
    async fn list(&self) -> Result<Vec<Media>>;
    async fn update(&self, id: Uuid, media: SaveMediaRequest) -> Result<Media>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Category>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>>;
    async fn list(&self) -> Result<Vec<Category>>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create(&self, transaction: NewTransaction) -> Result<Transaction>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>>;
    /// A user's transactions in storage (insertion) order.
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Transaction>>;
    async fn mark_returned(
        &self,
        id: Uuid,
        returned_at: DateTime<Utc>,
        amount_cents: i64,
        status: PaymentStatus,
    ) -> Result<Transaction>;
    async fn update_paid(&self, id: Uuid, paid_cents: i64, status: PaymentStatus) -> Result<Transaction>;

    async fn create_link(&self, transaction_id: Uuid) -> Result<Link>;
    async fn find_link_by_transaction(&self, transaction_id: Uuid) -> Result<Option<Link>>;
    async fn find_link_by_token(&self, token: &str) -> Result<Option<Link>>;
    async fn expire_link(&self, transaction_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: Payment) -> Result<Payment>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>>;
    /// Newest first.
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Payment>>;
    async fn add_allocation(&self, allocation: PaymentAllocation) -> Result<()>;
    async fn find_allocations(&self, payment_id: Uuid) -> Result<Vec<PaymentAllocation>>;
}
