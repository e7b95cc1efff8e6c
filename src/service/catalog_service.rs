use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{CategoryRepository, MediaRepository},
};

/// Shortest query that actually filters the library.
const MIN_SEARCH_LEN: usize = 3;

pub struct CatalogService {
    media_repo: Arc<dyn MediaRepository>,
    category_repo: Arc<dyn CategoryRepository>,
}

impl CatalogService {
    pub fn new(
        media_repo: Arc<dyn MediaRepository>,
        category_repo: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self { media_repo, category_repo }
    }

    pub async fn list(&self) -> Result<Vec<Media>> {
        self.media_repo.list().await
    }

    pub async fn find(&self, id: Uuid) -> Result<Media> {
        self.media_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Media not found".to_string()))
    }

    /// Case-insensitive match on title, type or description.
    pub async fn search(&self, query: &str) -> Result<Vec<Media>> {
        let all = self.media_repo.list().await?;
        Ok(filter_media(all, query))
    }

    /// Create or update a media item from the admin form. An id that is not
    /// in the catalog creates a new item.
    pub async fn save(&self, form: MediaForm) -> Result<Media> {
        form.validate()?;

        let media_type = MediaType::parse(&form.media_type)
            .ok_or_else(|| AppError::Validation(format!("Unknown media type: {}", form.media_type)))?;

        let categories = form.category_list();
        if categories.is_empty() {
            return Err(AppError::Validation("Category is required".to_string()));
        }

        let request = SaveMediaRequest {
            title: form.title.trim().to_string(),
            description: form.description.trim().to_string(),
            link: form.link.trim().to_string(),
            media_type,
            categories,
            rent_per_day_cents: form.rent_per_day_cents()?,
        };

        let existing_id = match form.media_id.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(
                Uuid::parse_str(raw)
                    .map_err(|_| AppError::Validation("Invalid media id".to_string()))?,
            ),
            _ => None,
        };

        match existing_id {
            Some(id) if self.media_repo.find_by_id(id).await?.is_some() => {
                let media = self.media_repo.update(id, request).await?;
                tracing::info!("Updated media '{}' ({})", media.title, media.id);
                Ok(media)
            }
            _ => {
                let media = self.media_repo.create(request).await?;
                tracing::info!("Added media '{}' ({})", media.title, media.id);
                Ok(media)
            }
        }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.category_repo.list().await
    }

    pub async fn add_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Category name is required".to_string()));
        }

        if self.category_repo.find_by_name(name).await?.is_some() {
            return Err(AppError::Conflict("Category already exists".to_string()));
        }

        self.category_repo.create(name).await
    }
}

pub fn filter_media(media: Vec<Media>, query: &str) -> Vec<Media> {
    let query = query.trim().to_lowercase();
    if query.chars().count() < MIN_SEARCH_LEN {
        return media;
    }

    media
        .into_iter()
        .filter(|m| {
            m.title.to_lowercase().contains(&query)
                || m.media_type.as_str().to_lowercase().contains(&query)
                || m.description.to_lowercase().contains(&query)
        })
        .collect()
}
