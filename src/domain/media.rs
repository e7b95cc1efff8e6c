use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::parse_amount;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub link: String,
    pub media_type: MediaType,
    pub rent_per_day_cents: i64,
    pub categories: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaType {
    Book,
    Movie,
    Music,
    Magazine,
}

impl MediaType {
    pub const ALL: [MediaType; 4] = [
        MediaType::Book,
        MediaType::Movie,
        MediaType::Music,
        MediaType::Magazine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Book => "Book",
            MediaType::Movie => "Movie",
            MediaType::Music => "Music",
            MediaType::Magazine => "Magazine",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Validated, normalised media fields ready to be persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMediaRequest {
    pub title: String,
    pub description: String,
    pub link: String,
    pub media_type: MediaType,
    pub categories: Vec<String>,
    pub rent_per_day_cents: i64,
}

/// Admin "manage media" form. `media_id` present means edit, absent means add.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MediaForm {
    #[serde(default)]
    pub media_id: Option<String>,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(url(message = "Invalid URL"))]
    pub link: String,
    pub media_type: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    /// Typed as text, e.g. `3` or `4.50`.
    #[validate(length(min = 1, message = "Rent per day is required"))]
    pub rent_per_day: String,
}

impl MediaForm {
    pub fn category_list(&self) -> Vec<String> {
        self.category
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Rent per day in cents. Anything below one whole unit is rejected.
    pub fn rent_per_day_cents(&self) -> Result<i64> {
        let cents = parse_amount(&self.rent_per_day)?;
        if cents < 100 {
            return Err(AppError::Validation("Rent per day must be at least 1.00".to_string()));
        }
        Ok(cents)
    }
}
