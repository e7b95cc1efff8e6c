use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Cash,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::Cash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "CreditCard",
            PaymentMethod::DebitCard => "DebitCard",
            PaymentMethod::Cash => "Cash",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Credit card",
            PaymentMethod::DebitCard => "Debit card",
            PaymentMethod::Cash => "Cash",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }

    pub fn takes_card(&self) -> bool {
        matches!(self, PaymentMethod::CreditCard | PaymentMethod::DebitCard)
    }

    /// Card payments need well-formed card details; cash needs none.
    pub fn check_card(&self, card: Option<&CardDetails>) -> Result<()> {
        if !self.takes_card() {
            return Ok(());
        }

        match card {
            Some(card) => Ok(card.validate()?),
            None => Err(AppError::Validation("Card details are required".to_string())),
        }
    }
}

/// Card details entered when paying dues. They are checked for shape only,
/// nothing is charged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CardDetails {
    #[serde(default)]
    #[validate(custom(function = "validate_card_number"))]
    pub card_number: String,
    /// `YYYY-MM`, as sent by a month input.
    #[serde(default)]
    #[validate(custom(function = "validate_card_expiry"))]
    pub card_expiry: String,
    #[serde(default)]
    #[validate(custom(function = "validate_card_cvv"))]
    pub card_cvv: String,
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn digits_ignoring_spaces(value: &str) -> Option<usize> {
    let digits: Vec<char> = value.chars().filter(|c| *c != ' ').collect();
    digits.iter().all(char::is_ascii_digit).then_some(digits.len())
}

fn validate_card_number(value: &str) -> std::result::Result<(), ValidationError> {
    match digits_ignoring_spaces(value) {
        Some(16) => Ok(()),
        _ => Err(invalid("card_number", "Card number must be 16 digits")),
    }
}

fn validate_card_expiry(value: &str) -> std::result::Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid("card_expiry", "Card expiry is required"));
    }

    NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| invalid("card_expiry", "Card expiry must look like 2027-08"))
}

fn validate_card_cvv(value: &str) -> std::result::Result<(), ValidationError> {
    let value = value.trim();
    if value.len() == 3 && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("card_cvv", "Card CVV must be 3 digits"))
    }
}

/// The slice of a payment that went towards one transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentAllocation {
    pub payment_id: Uuid,
    pub transaction_id: Uuid,
    pub amount_cents: i64,
}

/// Parse a currency amount typed into a form (`"12"`, `"12.5"`, `"$12.50"`)
/// into cents without going through floating point.
pub fn parse_amount(input: &str) -> Result<i64> {
    let invalid = || AppError::Validation(format!("Invalid amount: {}", input.trim()));

    let raw = input.trim().trim_start_matches('$');
    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (raw, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if fraction.len() > 2
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => fraction.parse().map_err(|_| invalid())?,
    };

    whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or_else(invalid)
}
