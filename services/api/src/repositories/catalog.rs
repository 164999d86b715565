//! Instrument categories, instruments and tags

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{Instrument, InstrumentCategory, Tag},
    repositories::{lock_member_bands, refresh_is_full},
};

const CATEGORY_CLASH: &str = "An instrument category with this title or slug already exists";

const INSTRUMENT_SELECT: &str = r#"
    SELECT i.id, i.title, c.title AS category
    FROM instruments i
    JOIN instrument_categories c ON c.id = i.category_id
"#;

/// Catalog repository, the admin-managed reference data
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_categories(&self) -> ApiResult<Vec<InstrumentCategory>> {
        let categories = sqlx::query_as::<_, InstrumentCategory>(
            "SELECT id, title, slug FROM instrument_categories ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn find_category(&self, slug: &str) -> ApiResult<Option<InstrumentCategory>> {
        let category = sqlx::query_as::<_, InstrumentCategory>(
            "SELECT id, title, slug FROM instrument_categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn create_category(&self, title: &str, slug: &str) -> ApiResult<InstrumentCategory> {
        sqlx::query_as::<_, InstrumentCategory>(
            r#"
            INSERT INTO instrument_categories (title, slug)
            VALUES ($1, $2)
            RETURNING id, title, slug
            "#,
        )
        .bind(title)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::unique_or(e, CATEGORY_CLASH))
    }

    pub async fn update_category(
        &self,
        slug: &str,
        title: Option<&str>,
        new_slug: Option<&str>,
    ) -> ApiResult<Option<InstrumentCategory>> {
        sqlx::query_as::<_, InstrumentCategory>(
            r#"
            UPDATE instrument_categories
            SET title = COALESCE($2, title), slug = COALESCE($3, slug)
            WHERE slug = $1
            RETURNING id, title, slug
            "#,
        )
        .bind(slug)
        .bind(title)
        .bind(new_slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::unique_or(e, CATEGORY_CLASH))
    }

    /// Delete a category with its instruments and the memberships played on them
    pub async fn delete_category(&self, slug: &str) -> ApiResult<bool> {
        let mut tx = self.pool.begin().await?;

        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM instrument_categories WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(id) = id else {
            return Ok(false);
        };

        let bands = lock_member_bands(
            &mut *tx,
            "m.instrument_id IN (SELECT id FROM instruments WHERE category_id = $1)",
            id,
        )
        .await?;

        sqlx::query("DELETE FROM instrument_categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        refresh_is_full(&mut *tx, &bands).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Insert a category unless one with the same title or slug exists;
    /// returns whether a row was added
    pub async fn ensure_category(&self, title: &str, slug: &str) -> ApiResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO instrument_categories (title, slug)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(title)
        .bind(slug)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert an instrument under the category titled `category` unless the
    /// instrument already exists; returns whether a row was added
    pub async fn ensure_instrument(&self, title: &str, category: &str) -> ApiResult<bool> {
        let category_id: Uuid =
            sqlx::query_scalar("SELECT id FROM instrument_categories WHERE title = $1")
                .bind(category)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| {
                    ApiError::BadRequest(format!("Unknown instrument category: {}", category))
                })?;

        let result = sqlx::query(
            "INSERT INTO instruments (title, category_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(title)
        .bind(category_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_instruments(&self) -> ApiResult<Vec<Instrument>> {
        let instruments =
            sqlx::query_as::<_, Instrument>(&format!("{} ORDER BY i.title", INSTRUMENT_SELECT))
                .fetch_all(&self.pool)
                .await?;
        Ok(instruments)
    }

    pub async fn find_instrument(&self, id: Uuid) -> ApiResult<Option<Instrument>> {
        let instrument =
            sqlx::query_as::<_, Instrument>(&format!("{} WHERE i.id = $1", INSTRUMENT_SELECT))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(instrument)
    }

    async fn category_id(&self, slug: &str) -> ApiResult<Uuid> {
        sqlx::query_scalar("SELECT id FROM instrument_categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown instrument category: {}", slug)))
    }

    pub async fn create_instrument(
        &self,
        title: &str,
        category_slug: &str,
    ) -> ApiResult<Instrument> {
        let category_id = self.category_id(category_slug).await?;

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO instruments (title, category_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(title)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::unique_or(e, "An instrument with this title already exists"))?;

        self.find_instrument(id)
            .await?
            .ok_or(ApiError::InternalServerError)
    }

    pub async fn update_instrument(
        &self,
        id: Uuid,
        title: Option<&str>,
        category_slug: Option<&str>,
    ) -> ApiResult<Option<Instrument>> {
        let category_id = match category_slug {
            Some(slug) => Some(self.category_id(slug).await?),
            None => None,
        };

        let result = sqlx::query(
            r#"
            UPDATE instruments
            SET title = COALESCE($2, title), category_id = COALESCE($3, category_id)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(category_id)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::unique_or(e, "An instrument with this title already exists"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_instrument(id).await
    }

    /// Delete an instrument; memberships played on it go with it
    pub async fn delete_instrument(&self, id: Uuid) -> ApiResult<bool> {
        let mut tx = self.pool.begin().await?;

        let bands = lock_member_bands(&mut *tx, "m.instrument_id = $1", id).await?;

        let result = sqlx::query("DELETE FROM instruments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        refresh_is_full(&mut *tx, &bands).await?;
        tx.commit().await?;
        Ok(true)
    }

    pub async fn list_tags(&self) -> ApiResult<Vec<Tag>> {
        let tags =
            sqlx::query_as::<_, Tag>("SELECT id, title, color, slug FROM tags ORDER BY title")
                .fetch_all(&self.pool)
                .await?;
        Ok(tags)
    }

    pub async fn find_tag(&self, slug: &str) -> ApiResult<Option<Tag>> {
        let tag =
            sqlx::query_as::<_, Tag>("SELECT id, title, color, slug FROM tags WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;
        Ok(tag)
    }

    pub async fn create_tag(&self, title: &str, color: &str, slug: &str) -> ApiResult<Tag> {
        sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (title, color, slug)
            VALUES ($1, $2, $3)
            RETURNING id, title, color, slug
            "#,
        )
        .bind(title)
        .bind(color)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::unique_or(e, "A tag with this title or slug already exists"))
    }

    pub async fn update_tag(
        &self,
        slug: &str,
        title: Option<&str>,
        color: Option<&str>,
        new_slug: Option<&str>,
    ) -> ApiResult<Option<Tag>> {
        sqlx::query_as::<_, Tag>(
            r#"
            UPDATE tags
            SET title = COALESCE($2, title),
                color = COALESCE($3, color),
                slug = COALESCE($4, slug)
            WHERE slug = $1
            RETURNING id, title, color, slug
            "#,
        )
        .bind(slug)
        .bind(title)
        .bind(color)
        .bind(new_slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::unique_or(e, "A tag with this title or slug already exists"))
    }

    pub async fn delete_tag(&self, slug: &str) -> ApiResult<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
