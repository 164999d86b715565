//! Repositories for database operations

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    membership::MembershipError,
};

pub mod band;
pub mod catalog;
pub mod membership;
pub mod post;
pub mod user;

pub use band::BandRepository;
pub use catalog::CatalogRepository;
pub use membership::MembershipRepository;
pub use post::PostRepository;
pub use user::UserRepository;

/// Look up an instrument id by its title
pub(crate) async fn find_instrument_id(
    conn: &mut PgConnection,
    title: &str,
) -> ApiResult<Option<Uuid>> {
    let id = sqlx::query_scalar("SELECT id FROM instruments WHERE title = $1")
        .bind(title)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

/// Resolve instrument titles to ids, failing on the first unknown title
pub(crate) async fn resolve_instruments(
    conn: &mut PgConnection,
    titles: &[String],
) -> ApiResult<Vec<Uuid>> {
    let rows: Vec<(Uuid, String)> =
        sqlx::query_as("SELECT id, title FROM instruments WHERE title = ANY($1)")
            .bind(titles)
            .fetch_all(conn)
            .await?;

    if let Some(missing) = titles
        .iter()
        .find(|t| !rows.iter().any(|(_, title)| title == *t))
    {
        return Err(ApiError::BadRequest(format!("Unknown instrument: {}", missing)));
    }

    Ok(rows.into_iter().map(|(id, _)| id).collect())
}

/// Whether the user currently belongs to any band
pub(crate) async fn has_band(conn: &mut PgConnection, user_id: Uuid) -> ApiResult<bool> {
    let exists = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM user_band_instruments WHERE user_id = $1)",
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

/// Whether the user is a member of the given band
pub(crate) async fn is_member(
    conn: &mut PgConnection,
    user_id: Uuid,
    band_id: Uuid,
) -> ApiResult<bool> {
    let exists = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM user_band_instruments WHERE user_id = $1 AND band_id = $2)",
    )
    .bind(user_id)
    .bind(band_id)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

/// Number of members of a band
pub(crate) async fn participant_count(conn: &mut PgConnection, band_id: Uuid) -> ApiResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM user_band_instruments WHERE band_id = $1")
        .bind(band_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Record a membership, mapping a clash on the one-band-per-user index to `on_conflict`
pub(crate) async fn enrol(
    conn: &mut PgConnection,
    user_id: Uuid,
    band_id: Uuid,
    instrument_id: Uuid,
    on_conflict: MembershipError,
) -> ApiResult<()> {
    sqlx::query(
        "INSERT INTO user_band_instruments (user_id, band_id, instrument_id) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(band_id)
    .bind(instrument_id)
    .execute(conn)
    .await
    .map_err(|e| ApiError::unique_or(e, &on_conflict.to_string()))?;
    Ok(())
}

/// Lock, in id order, the bands holding a membership matched by `member_filter`.
/// The filter is a condition on `user_band_instruments m` binding `$1`.
pub(crate) async fn lock_member_bands(
    conn: &mut PgConnection,
    member_filter: &str,
    key: Uuid,
) -> ApiResult<Vec<Uuid>> {
    let bands = sqlx::query_scalar(&format!(
        r#"
        SELECT id FROM bands
        WHERE id IN (SELECT m.band_id FROM user_band_instruments m WHERE {})
        ORDER BY id
        FOR UPDATE
        "#,
        member_filter
    ))
    .bind(key)
    .fetch_all(conn)
    .await?;
    Ok(bands)
}

/// Recompute `is_full` from the current participant count
pub(crate) async fn refresh_is_full(conn: &mut PgConnection, band_ids: &[Uuid]) -> ApiResult<()> {
    if band_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        UPDATE bands b
        SET is_full = (
            SELECT COUNT(*) FROM user_band_instruments m WHERE m.band_id = b.id
        ) >= b.quantity
        WHERE b.id = ANY($1)
        "#,
    )
    .bind(band_ids)
    .execute(conn)
    .await?;
    Ok(())
}
