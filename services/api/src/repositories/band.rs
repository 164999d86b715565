//! Band repository

use std::collections::HashMap;

use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    membership::{self, MembershipError},
    models::{BandResponse, BandRow, MemberResponse},
    repositories::{enrol, find_instrument_id, has_band, participant_count},
};

/// Bands joined with their author and the instrument the author plays.
/// `$1` is the viewer: hidden bands are only returned to their author.
const BAND_SELECT: &str = r#"
    SELECT b.id, b.author_id,
           u.username AS author_username,
           u.first_name AS author_first_name,
           u.last_name AS author_last_name,
           ai.title AS author_instrument,
           b.title, b.description, b.quantity, b.is_full, b.is_visible,
           b.poster, b.pub_date
    FROM bands b
    JOIN users u ON u.id = b.author_id
    LEFT JOIN user_band_instruments am ON am.user_id = b.author_id AND am.band_id = b.id
    LEFT JOIN instruments ai ON ai.id = am.instrument_id
    WHERE (b.is_visible OR b.author_id = $1)
"#;

#[derive(FromRow)]
struct MemberRow {
    band_id: Uuid,
    #[sqlx(flatten)]
    member: MemberResponse,
}

/// A band about to be created; `poster` is already stored
#[derive(Debug)]
pub struct NewBand<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub quantity: i16,
    pub is_visible: bool,
    pub poster: Option<String>,
    pub instrument: Option<&'a str>,
}

/// Changes to an existing band; `None` keeps the current value
#[derive(Debug, Default)]
pub struct BandChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i16>,
    pub is_visible: Option<bool>,
    pub poster: Option<String>,
}

#[derive(Clone)]
pub struct BandRepository {
    pool: PgPool,
}

impl BandRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bands the viewer can see, newest first
    pub async fn list(&self, viewer: Option<Uuid>) -> ApiResult<Vec<BandResponse>> {
        let rows = sqlx::query_as::<_, BandRow>(&format!(
            "{} ORDER BY b.pub_date DESC",
            BAND_SELECT
        ))
        .bind(viewer)
        .fetch_all(&self.pool)
        .await?;

        self.with_members(rows).await
    }

    pub async fn find(&self, id: Uuid, viewer: Option<Uuid>) -> ApiResult<Option<BandResponse>> {
        let row = sqlx::query_as::<_, BandRow>(&format!("{} AND b.id = $2", BAND_SELECT))
            .bind(viewer)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.with_members(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Author of a band the viewer can see
    pub async fn author_of(&self, id: Uuid, viewer: Option<Uuid>) -> ApiResult<Option<Uuid>> {
        let author = sqlx::query_scalar(
            "SELECT author_id FROM bands WHERE id = $1 AND (is_visible OR author_id = $2)",
        )
        .bind(id)
        .bind(viewer)
        .fetch_optional(&self.pool)
        .await?;
        Ok(author)
    }

    /// Create a band and enrol its author in one transaction
    pub async fn create(&self, author_id: Uuid, band: &NewBand<'_>) -> ApiResult<BandResponse> {
        let is_full = membership::initial_is_full(band.quantity)?;

        let mut tx = self.pool.begin().await?;

        let instrument_id = match band.instrument {
            Some(title) => find_instrument_id(&mut *tx, title).await?,
            None => None,
        }
        .ok_or_else(|| ApiError::bad_request("Fill your instrument field correctly"))?;

        membership::ensure_unaffiliated(has_band(&mut *tx, author_id).await?)?;

        let band_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO bands (author_id, title, description, quantity, is_full, is_visible, poster)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(author_id)
        .bind(band.title)
        .bind(band.description)
        .bind(band.quantity)
        .bind(is_full)
        .bind(band.is_visible)
        .bind(&band.poster)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ApiError::unique_or(e, "A band with this title already exists"))?;

        enrol(
            &mut *tx,
            author_id,
            band_id,
            instrument_id,
            MembershipError::AlreadyHasBand,
        )
        .await?;

        tx.commit().await?;
        info!("User {} created band {}", author_id, band_id);

        self.find(band_id, Some(author_id))
            .await?
            .ok_or(ApiError::InternalServerError)
    }

    /// Apply changes, returning the updated band and the poster it replaced
    pub async fn update(
        &self,
        id: Uuid,
        viewer: Uuid,
        changes: &BandChanges,
    ) -> ApiResult<(BandResponse, Option<String>)> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(i16, Option<String>)> =
            sqlx::query_as("SELECT quantity, poster FROM bands WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let (quantity, old_poster) = locked.ok_or_else(|| ApiError::not_found("Band not found"))?;

        let participants = participant_count(&mut *tx, id).await?;
        let is_full = match changes.quantity {
            Some(quantity) => membership::resize(participants, quantity)?,
            None => membership::is_full(participants, quantity),
        };

        sqlx::query(
            r#"
            UPDATE bands
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                quantity = COALESCE($4, quantity),
                is_visible = COALESCE($5, is_visible),
                poster = COALESCE($6, poster),
                is_full = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.quantity)
        .bind(changes.is_visible)
        .bind(&changes.poster)
        .bind(is_full)
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::unique_or(e, "A band with this title already exists"))?;

        tx.commit().await?;

        let band = self
            .find(id, Some(viewer))
            .await?
            .ok_or_else(|| ApiError::not_found("Band not found"))?;
        let replaced = old_poster.filter(|_| changes.poster.is_some());
        Ok((band, replaced))
    }

    /// Delete a band; memberships, requests and invites cascade.
    /// Returns the stored poster path, `None` if the band did not exist.
    pub async fn delete(&self, id: Uuid) -> ApiResult<Option<Option<String>>> {
        let poster: Option<Option<String>> =
            sqlx::query_scalar("DELETE FROM bands WHERE id = $1 RETURNING poster")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        if poster.is_some() {
            info!("Deleted band {}", id);
        }
        Ok(poster)
    }

    async fn with_members(&self, rows: Vec<BandRow>) -> ApiResult<Vec<BandResponse>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut members = self.members(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let participants = members.remove(&row.id).unwrap_or_default();
                BandResponse::new(row, participants)
            })
            .collect())
    }

    /// Participants of each band, in joining order
    async fn members(&self, band_ids: &[Uuid]) -> ApiResult<HashMap<Uuid, Vec<MemberResponse>>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT m.band_id, u.id, u.username, u.first_name, u.last_name,
                   i.title AS instrument
            FROM user_band_instruments m
            JOIN users u ON u.id = m.user_id
            JOIN instruments i ON i.id = m.instrument_id
            WHERE m.band_id = ANY($1)
            ORDER BY m.joined_at
            "#,
        )
        .bind(band_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<MemberResponse>> = HashMap::new();
        for row in rows {
            grouped.entry(row.band_id).or_default().push(row.member);
        }
        Ok(grouped)
    }
}
