use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Media;

/// A single rental of one media item by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub media_id: Uuid,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub amount_cents: i64,
    pub paid_cents: i64,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Outstanding balance, `amount - paid`.
    pub fn pending_cents(&self) -> i64 {
        (self.amount_cents - self.paid_cents).max(0)
    }

    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    /// Paid only when the whole amount is covered.
    pub fn for_balance(amount_cents: i64, paid_cents: i64) -> Self {
        if paid_cents == amount_cents {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::Paid => "Paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Unpaid" => Some(PaymentStatus::Unpaid),
            "Paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub media_id: Uuid,
    pub borrowed_at: DateTime<Utc>,
    pub amount_cents: i64,
    pub paid_cents: i64,
}

/// Share token handed out with a rental; expires when the item comes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub token: String,
    pub expired: bool,
    pub created_at: DateTime<Utc>,
}

/// A transaction together with what was rented and its share link.
#[derive(Debug, Clone, Serialize)]
pub struct RentalRecord {
    pub transaction: Transaction,
    pub media: Media,
    pub link: Option<Link>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuesSummary {
    pub rented: Vec<RentalRecord>,
    pub returned: Vec<RentalRecord>,
    pub total_billed_cents: i64,
    pub total_due_cents: i64,
}
