//! Rent, return and dues bookkeeping for borrowed media.
//!
//! A rental starts out charged one day of rent. Returning it re-prices the
//! rental by the number of calendar days it was out, and payments are spread
//! over the balances of returned rentals oldest first.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{MediaRepository, PaymentRepository, TransactionRepository, UserRepository},
};

/// Whole days a rental has been out, counted on UTC calendar dates.
///
/// Same-day returns count as one day; otherwise both the borrow day and the
/// return day are charged, so two days later is three days of rent.
pub fn elapsed_days(borrowed_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let diff = (now.date_naive() - borrowed_at.date_naive()).num_days().abs();
    if diff == 0 { 1 } else { diff + 1 }
}

pub fn rent_due(rent_per_day_cents: i64, days: i64) -> i64 {
    rent_per_day_cents.saturating_mul(days).max(0)
}

/// The effect of a payment on one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditSlice {
    pub transaction_id: Uuid,
    pub applied_cents: i64,
    /// New running total paid on the transaction.
    pub paid_cents: i64,
    pub status: PaymentStatus,
}

/// Spread `credit_cents` over the transactions' outstanding balances in the
/// order given, stopping once the credit runs out.
pub fn apply_credit(transactions: &[Transaction], credit_cents: i64) -> Vec<CreditSlice> {
    let mut credit = credit_cents;
    let mut slices = Vec::new();

    for transaction in transactions {
        if credit <= 0 {
            break;
        }

        let pending = transaction.pending_cents();
        if pending == 0 {
            continue;
        }

        let applied = credit.min(pending);
        let paid_cents = transaction.paid_cents + applied;

        slices.push(CreditSlice {
            transaction_id: transaction.id,
            applied_cents: applied,
            paid_cents,
            status: PaymentStatus::for_balance(transaction.amount_cents, paid_cents),
        });

        credit -= applied;
    }

    slices
}

#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    pub transactions: Vec<Transaction>,
    pub payment: Option<Payment>,
}

pub struct RentalLedger {
    user_repo: Arc<dyn UserRepository>,
    media_repo: Arc<dyn MediaRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    return_window_days: i64,
}

impl RentalLedger {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        media_repo: Arc<dyn MediaRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        return_window_days: i64,
    ) -> Self {
        Self {
            user_repo,
            media_repo,
            transaction_repo,
            payment_repo,
            return_window_days,
        }
    }

    /// Rent one item. The first day is billed up front and left unpaid.
    pub async fn rent(&self, user_id: Uuid, media_id: Uuid) -> Result<Transaction> {
        self.require_user(user_id).await?;
        let media = self.require_media(media_id).await?;

        let transaction = self.open_rental(user_id, &media, 0).await?;

        tracing::info!(
            "User {} rented '{}' (transaction {})",
            user_id, media.title, transaction.id
        );

        Ok(transaction)
    }

    /// Rent several items at once, paying the first day of each immediately.
    ///
    /// Every media id is resolved before anything is written.
    pub async fn checkout(
        &self,
        user_id: Uuid,
        media_ids: &[Uuid],
        method: PaymentMethod,
    ) -> Result<Checkout> {
        if media_ids.is_empty() {
            return Err(AppError::Validation("Select at least one item to rent".to_string()));
        }

        self.require_user(user_id).await?;

        let mut items = Vec::with_capacity(media_ids.len());
        for media_id in media_ids {
            items.push(self.require_media(*media_id).await?);
        }

        let mut transactions = Vec::with_capacity(items.len());
        for media in &items {
            transactions.push(self.open_rental(user_id, media, media.rent_per_day_cents).await?);
        }

        let total: i64 = transactions.iter().map(|t| t.paid_cents).sum();
        let payment = if total > 0 {
            let payment = self.record_payment(user_id, total, method).await?;
            for transaction in transactions.iter().filter(|t| t.paid_cents > 0) {
                self.payment_repo
                    .add_allocation(PaymentAllocation {
                        payment_id: payment.id,
                        transaction_id: transaction.id,
                        amount_cents: transaction.paid_cents,
                    })
                    .await?;
            }
            Some(payment)
        } else {
            None
        };

        tracing::info!(
            "User {} checked out {} item(s), paid {} cents",
            user_id, transactions.len(), total
        );

        Ok(Checkout { transactions, payment })
    }

    pub async fn return_media(&self, transaction_id: Uuid) -> Result<Transaction> {
        self.return_media_at(transaction_id, Utc::now()).await
    }

    /// Close a rental as of `now`: price it by elapsed days and expire its link.
    pub async fn return_media_at(&self, transaction_id: Uuid, now: DateTime<Utc>) -> Result<Transaction> {
        let transaction = self.transaction_repo
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

        if transaction.is_returned() {
            return Err(AppError::Validation("Media has already been returned".to_string()));
        }

        let media = self.require_media(transaction.media_id).await?;

        let days = elapsed_days(transaction.borrowed_at, now);
        // paid never exceeds amount, even if the rate was lowered mid-rental
        let amount = rent_due(media.rent_per_day_cents, days).max(transaction.paid_cents);
        let status = PaymentStatus::for_balance(amount, transaction.paid_cents);

        let returned = self.transaction_repo
            .mark_returned(transaction_id, now, amount, status)
            .await?;
        self.transaction_repo.expire_link(transaction_id).await?;

        tracing::info!(
            "Transaction {} returned after {} day(s), amount {} cents",
            transaction_id, days, amount
        );

        Ok(returned)
    }

    /// Apply `amount_cents` against the balances of the user's returned
    /// rentals in storage order and record a payment for what was actually
    /// applied. Rentals still out are not due yet and take no credit, the same
    /// rule `dues_summary` totals by.
    pub async fn clear_dues(
        &self,
        user_id: Uuid,
        method: PaymentMethod,
        amount_cents: i64,
    ) -> Result<Payment> {
        if amount_cents <= 0 {
            return Err(AppError::Validation("Payment amount must be greater than zero".to_string()));
        }

        let transactions = self.transaction_repo.find_by_user(user_id).await?;
        if transactions.is_empty() {
            return Err(AppError::NotFound("No transactions found".to_string()));
        }

        let returned: Vec<Transaction> = transactions
            .into_iter()
            .filter(Transaction::is_returned)
            .collect();

        let slices = apply_credit(&returned, amount_cents);
        let applied: i64 = slices.iter().map(|s| s.applied_cents).sum();
        if applied == 0 {
            return Err(AppError::Validation("No outstanding dues".to_string()));
        }

        let payment = self.record_payment(user_id, applied, method).await?;

        for slice in &slices {
            self.transaction_repo
                .update_paid(slice.transaction_id, slice.paid_cents, slice.status)
                .await?;
            self.payment_repo
                .add_allocation(PaymentAllocation {
                    payment_id: payment.id,
                    transaction_id: slice.transaction_id,
                    amount_cents: slice.applied_cents,
                })
                .await?;
        }

        if applied < amount_cents {
            tracing::debug!(
                "User {} offered {} cents, only {} cents were due",
                user_id, amount_cents, applied
            );
        }
        tracing::info!(
            "User {} paid {} cents across {} transaction(s)",
            user_id, applied, slices.len()
        );

        Ok(payment)
    }

    /// A user's rentals with their media and share links, in storage order.
    pub async fn transactions_for(&self, user_id: Uuid) -> Result<Vec<RentalRecord>> {
        let transactions = self.transaction_repo.find_by_user(user_id).await?;
        if transactions.is_empty() {
            return Ok(Vec::new());
        }

        let catalog: HashMap<Uuid, Media> = self.media_repo
            .list()
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        let mut records = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let media = catalog
                .get(&transaction.media_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;
            let link = self.transaction_repo
                .find_link_by_transaction(transaction.id)
                .await?;

            records.push(RentalRecord { transaction, media, link });
        }

        Ok(records)
    }

    pub async fn dues_summary(&self, user_id: Uuid) -> Result<DuesSummary> {
        let (returned, rented): (Vec<_>, Vec<_>) = self
            .transactions_for(user_id)
            .await?
            .into_iter()
            .partition(|r| r.transaction.is_returned());

        let total_billed_cents = returned
            .iter()
            .map(|r| r.transaction.amount_cents)
            .sum();
        let total_due_cents = returned
            .iter()
            .filter(|r| r.transaction.payment_status == PaymentStatus::Unpaid)
            .map(|r| r.transaction.pending_cents())
            .sum();

        Ok(DuesSummary {
            rented,
            returned,
            total_billed_cents,
            total_due_cents,
        })
    }

    pub async fn payments_for(&self, user_id: Uuid) -> Result<Vec<Payment>> {
        self.payment_repo.find_by_user(user_id).await
    }

    /// Resolve a share token to its media. Tokens only open for the renter and
    /// only while the rental is out.
    pub async fn open_shared(&self, user_id: Uuid, token: &str) -> Result<Option<Media>> {
        let Some(link) = self.transaction_repo.find_link_by_token(token).await? else {
            return Ok(None);
        };
        if link.expired {
            return Ok(None);
        }

        let Some(transaction) = self.transaction_repo.find_by_id(link.transaction_id).await? else {
            return Ok(None);
        };
        if transaction.user_id != user_id {
            return Ok(None);
        }

        self.media_repo.find_by_id(transaction.media_id).await
    }

    pub fn due_back_by(&self, borrowed_at: DateTime<Utc>) -> DateTime<Utc> {
        borrowed_at + Duration::days(self.return_window_days)
    }

    pub fn is_overdue(&self, transaction: &Transaction, now: DateTime<Utc>) -> bool {
        !transaction.is_returned() && now > self.due_back_by(transaction.borrowed_at)
    }

    async fn open_rental(&self, user_id: Uuid, media: &Media, paid_cents: i64) -> Result<Transaction> {
        let transaction = self.transaction_repo
            .create(NewTransaction {
                user_id,
                media_id: media.id,
                borrowed_at: Utc::now(),
                amount_cents: media.rent_per_day_cents,
                paid_cents,
            })
            .await?;

        self.transaction_repo.create_link(transaction.id).await?;

        Ok(transaction)
    }

    async fn record_payment(&self, user_id: Uuid, amount_cents: i64, method: PaymentMethod) -> Result<Payment> {
        self.payment_repo
            .create(Payment {
                id: Uuid::new_v4(),
                user_id,
                amount_cents,
                method,
                created_at: Utc::now(),
            })
            .await
    }

    async fn require_user(&self, user_id: Uuid) -> Result<User> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn require_media(&self, media_id: Uuid) -> Result<Media> {
        self.media_repo
            .find_by_id(media_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Media not found".to_string()))
    }
}
