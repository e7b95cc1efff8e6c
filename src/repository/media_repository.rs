use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::{
    domain::{Media, MediaType, SaveMediaRequest},
    error::{AppError, Result},
    repository::MediaRepository,
};

#[derive(FromRow)]
struct MediaRow {
    id: String,
    title: String,
    description: String,
    link: String,
    media_type: String,
    rent_per_day_cents: i64,
    categories: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteMediaRepository {
    pool: SqlitePool,
}

impl SqliteMediaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_media(row: MediaRow) -> Result<Media> {
        Ok(Media {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            title: row.title,
            description: row.description,
            link: row.link,
            media_type: MediaType::parse(&row.media_type)
                .ok_or_else(|| AppError::Database(format!("Invalid media type: {}", row.media_type)))?,
            rent_per_day_cents: row.rent_per_day_cents,
            // Categories are kept as a JSON array of names
            categories: serde_json::from_str(&row.categories)
                .map_err(|e| AppError::Database(e.to_string()))?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn encode_categories(categories: &[String]) -> Result<String> {
        serde_json::to_string(categories).map_err(|e| AppError::Internal(e.to_string()))
    }
}

#[async_trait]
impl MediaRepository for SqliteMediaRepository {
    async fn create(&self, media: SaveMediaRequest) -> Result<Media> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let categories = Self::encode_categories(&media.categories)?;

        sqlx::query(
            r#"
            INSERT INTO media (
                id, title, description, link, media_type,
                rent_per_day_cents, categories, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(&media.title)
        .bind(&media.description)
        .bind(&media.link)
        .bind(media.media_type.as_str())
        .bind(media.rent_per_day_cents)
        .bind(&categories)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created media".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Media>> {
        let row = sqlx::query_as::<_, MediaRow>(
            r#"
            SELECT id, title, description, link, media_type,
                   rent_per_day_cents, categories, created_at, updated_at
            FROM media
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_media(r)?)),
            None => Ok(None)
        }
    }

    async fn list(&self) -> Result<Vec<Media>> {
        let rows = sqlx::query_as::<_, MediaRow>(
            r#"
            SELECT id, title, description, link, media_type,
                   rent_per_day_cents, categories, created_at, updated_at
            FROM media
            ORDER BY title ASC
            "#
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_media)
            .collect()
    }

    async fn update(&self, id: Uuid, media: SaveMediaRequest) -> Result<Media> {
        let now = Utc::now().naive_utc();
        let categories = Self::encode_categories(&media.categories)?;

        let result = sqlx::query(
            r#"
            UPDATE media
            SET title = ?,
                description = ?,
                link = ?,
                media_type = ?,
                rent_per_day_cents = ?,
                categories = ?,
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(&media.title)
        .bind(&media.description)
        .bind(&media.link)
        .bind(media.media_type.as_str())
        .bind(media.rent_per_day_cents)
        .bind(&categories)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Media not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated media".to_string())
        })
    }
}
