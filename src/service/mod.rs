pub mod rental_ledger;
pub mod catalog_service;
pub mod user_service;

use std::sync::Arc;
use sqlx::SqlitePool;
use crate::repository::*;
use crate::auth::{AuthService, CsrfService};
use crate::config::Settings;
use rental_ledger::RentalLedger;
use catalog_service::CatalogService;
use user_service::UserService;

pub use rental_ledger::Checkout;
pub use user_service::RenterActivity;

pub struct ServiceContext {
    pub user_repo: Arc<dyn UserRepository>,
    pub transaction_repo: Arc<dyn TransactionRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub auth_service: Arc<AuthService>,
    pub csrf_service: Arc<CsrfService>,
    pub rental_ledger: Arc<RentalLedger>,
    pub catalog_service: Arc<CatalogService>,
    pub user_service: Arc<UserService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool, settings: &Settings) -> Self {
        let user_repo: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(db_pool.clone()));
        let media_repo: Arc<dyn MediaRepository> = Arc::new(SqliteMediaRepository::new(db_pool.clone()));
        let category_repo: Arc<dyn CategoryRepository> = Arc::new(SqliteCategoryRepository::new(db_pool.clone()));
        let transaction_repo: Arc<dyn TransactionRepository> = Arc::new(SqliteTransactionRepository::new(db_pool.clone()));
        let payment_repo: Arc<dyn PaymentRepository> = Arc::new(SqlitePaymentRepository::new(db_pool.clone()));

        let auth_service = Arc::new(AuthService::new(db_pool.clone(), &settings.auth));
        let csrf_service = Arc::new(CsrfService::new(db_pool.clone()));

        let rental_ledger = Arc::new(RentalLedger::new(
            user_repo.clone(),
            media_repo.clone(),
            transaction_repo.clone(),
            payment_repo.clone(),
            settings.rental.return_window_days,
        ));
        let catalog_service = Arc::new(CatalogService::new(media_repo.clone(), category_repo));
        let user_service = Arc::new(UserService::new(user_repo.clone(), rental_ledger.clone()));

        Self {
            user_repo,
            transaction_repo,
            payment_repo,
            auth_service,
            csrf_service,
            rental_ledger,
            catalog_service,
            user_service,
            db_pool,
        }
    }
}
