//! Join requests and invites
//!
//! Acceptance locks the band row first and the request or invite row second,
//! the same order a cascading band delete takes them in. Two owners accepting
//! concurrently into the same band therefore serialize on the band row and
//! the second one sees the updated participant count.

use sqlx::{FromRow, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    membership::{
        self, AcceptanceCheck, InviteCheck, JoinRequestCheck, Joiner, MembershipError,
    },
    models::{InviteResponse, JoinRequestResponse},
    repositories::{enrol, find_instrument_id, has_band, is_member, participant_count},
};

const REQUEST_SELECT: &str = r#"
    SELECT r.id, o.username AS user, r.band_id AS band, i.title AS instrument,
           r.author_id AS author, r.created_at
    FROM requests r
    JOIN users o ON o.id = r.user_id
    JOIN instruments i ON i.id = r.instrument_id
"#;

const INVITE_SELECT: &str = r#"
    SELECT v.id, v.user_id AS user, b.title AS band, i.title AS instrument,
           v.author_id AS author, v.created_at
    FROM invites v
    JOIN bands b ON b.id = v.band_id
    JOIN instruments i ON i.id = v.instrument_id
"#;

/// Routing facts of a pending request or invite
#[derive(Debug, FromRow)]
struct Pending {
    band_id: Uuid,
    author_id: Uuid,
    user_id: Uuid,
    instrument_id: Uuid,
}

#[derive(Debug, Clone, Copy)]
enum PendingKind {
    Request,
    Invite,
}

impl PendingKind {
    fn table(self) -> &'static str {
        match self {
            PendingKind::Request => "requests",
            PendingKind::Invite => "invites",
        }
    }

    fn not_found(self) -> ApiError {
        match self {
            PendingKind::Request => ApiError::not_found("Request not found"),
            PendingKind::Invite => ApiError::not_found("Invite not found"),
        }
    }

    fn forbidden(self) -> ApiError {
        match self {
            PendingKind::Request => {
                ApiError::forbidden("This request is not addressed to your band")
            }
            PendingKind::Invite => ApiError::forbidden("This invite is not addressed to you"),
        }
    }
}

#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ask to join a band the requester can see
    pub async fn send_request(
        &self,
        band_id: Uuid,
        requester: Uuid,
        instrument: Option<&str>,
    ) -> ApiResult<JoinRequestResponse> {
        let mut tx = self.pool.begin().await?;

        let band_owner: Uuid = sqlx::query_scalar(
            "SELECT author_id FROM bands WHERE id = $1 AND (is_visible OR author_id = $2)",
        )
        .bind(band_id)
        .bind(requester)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Band not found"))?;

        let instrument_id = instrument_for(&mut tx, instrument).await?;

        let duplicate_exists = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM requests WHERE author_id = $1 AND band_id = $2)",
        )
        .bind(requester)
        .bind(band_id)
        .fetch_one(&mut *tx)
        .await?;

        membership::validate_join_request(&JoinRequestCheck {
            requester,
            band_owner,
            requester_in_band: is_member(&mut *tx, requester, band_id).await?,
            duplicate_exists,
        })?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO requests (author_id, band_id, user_id, instrument_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(requester)
        .bind(band_id)
        .bind(band_owner)
        .bind(instrument_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ApiError::unique_or(e, &MembershipError::DuplicateRequest.to_string()))?;

        let request = sqlx::query_as::<_, JoinRequestResponse>(&format!(
            "{} WHERE r.id = $1",
            REQUEST_SELECT
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("User {} asked to join band {}", requester, band_id);
        Ok(request)
    }

    /// Withdraw the requester's own request to a band
    pub async fn withdraw_request(&self, band_id: Uuid, requester: Uuid) -> ApiResult<bool> {
        let result = sqlx::query("DELETE FROM requests WHERE band_id = $1 AND author_id = $2")
            .bind(band_id)
            .bind(requester)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Requests addressed to the owner's band
    pub async fn list_requests(&self, owner: Uuid) -> ApiResult<Vec<JoinRequestResponse>> {
        let requests = sqlx::query_as::<_, JoinRequestResponse>(&format!(
            "{} WHERE r.user_id = $1 ORDER BY r.created_at",
            REQUEST_SELECT
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    pub async fn find_request(
        &self,
        id: Uuid,
        owner: Uuid,
    ) -> ApiResult<Option<JoinRequestResponse>> {
        let request = sqlx::query_as::<_, JoinRequestResponse>(&format!(
            "{} WHERE r.id = $1 AND r.user_id = $2",
            REQUEST_SELECT
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    /// The band owner takes the requester into the band
    pub async fn accept_request(&self, id: Uuid, owner: Uuid) -> ApiResult<()> {
        let mut tx = self.pool.begin().await?;

        let pending = lock_pending(&mut tx, PendingKind::Request, id, owner).await?;

        let is_full = membership::validate_acceptance(&AcceptanceCheck {
            joiner: Joiner::Requester,
            joiner_has_band: has_band(&mut *tx, pending.author_id).await?,
            participants: participant_count(&mut *tx, pending.band_id).await?,
            quantity: band_quantity(&mut tx, pending.band_id).await?,
        })?;

        admit(
            &mut tx,
            PendingKind::Request,
            id,
            &pending,
            pending.author_id,
            is_full,
            MembershipError::CandidateHasBand,
        )
        .await?;

        tx.commit().await?;
        info!(
            request = %id,
            band = %pending.band_id,
            member = %pending.author_id,
            is_full,
            "Join request accepted"
        );
        Ok(())
    }

    /// The band owner turns a request down
    pub async fn decline_request(&self, id: Uuid, owner: Uuid) -> ApiResult<()> {
        decline(&self.pool, PendingKind::Request, id, owner).await
    }

    /// Invite a user into the band the owner created
    pub async fn invite(
        &self,
        invitee: Uuid,
        owner: Uuid,
        instrument: Option<&str>,
    ) -> ApiResult<InviteResponse> {
        let mut tx = self.pool.begin().await?;

        let invitee_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(invitee)
                .fetch_one(&mut *tx)
                .await?;
        if !invitee_exists {
            return Err(ApiError::not_found("User not found"));
        }

        let band_id: Uuid = sqlx::query_scalar(
            "SELECT id FROM bands WHERE author_id = $1 ORDER BY pub_date DESC LIMIT 1",
        )
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(MembershipError::NoOwnedBand)?;

        let instrument_id = instrument_for(&mut tx, instrument).await?;

        let duplicate_exists = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM invites WHERE author_id = $1 AND user_id = $2)",
        )
        .bind(owner)
        .bind(invitee)
        .fetch_one(&mut *tx)
        .await?;

        membership::validate_invite(&InviteCheck {
            owns_band: true,
            invitee_in_band: is_member(&mut *tx, invitee, band_id).await?,
            duplicate_exists,
        })?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO invites (author_id, user_id, band_id, instrument_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(invitee)
        .bind(band_id)
        .bind(instrument_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ApiError::unique_or(e, &MembershipError::DuplicateInvite.to_string()))?;

        let invite = sqlx::query_as::<_, InviteResponse>(&format!(
            "{} WHERE v.id = $1",
            INVITE_SELECT
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("User {} invited {} into band {}", owner, invitee, band_id);
        Ok(invite)
    }

    /// Withdraw the owner's invite to a user
    pub async fn cancel_invite(&self, invitee: Uuid, owner: Uuid) -> ApiResult<bool> {
        let result = sqlx::query("DELETE FROM invites WHERE user_id = $1 AND author_id = $2")
            .bind(invitee)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Invites addressed to the user
    pub async fn list_invites(&self, invitee: Uuid) -> ApiResult<Vec<InviteResponse>> {
        let invites = sqlx::query_as::<_, InviteResponse>(&format!(
            "{} WHERE v.user_id = $1 ORDER BY v.created_at",
            INVITE_SELECT
        ))
        .bind(invitee)
        .fetch_all(&self.pool)
        .await?;
        Ok(invites)
    }

    pub async fn find_invite(&self, id: Uuid, invitee: Uuid) -> ApiResult<Option<InviteResponse>> {
        let invite = sqlx::query_as::<_, InviteResponse>(&format!(
            "{} WHERE v.id = $1 AND v.user_id = $2",
            INVITE_SELECT
        ))
        .bind(id)
        .bind(invitee)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invite)
    }

    /// The invitee joins the band they were invited into
    pub async fn accept_invite(&self, id: Uuid, invitee: Uuid) -> ApiResult<()> {
        let mut tx = self.pool.begin().await?;

        let pending = lock_pending(&mut tx, PendingKind::Invite, id, invitee).await?;

        let is_full = membership::validate_acceptance(&AcceptanceCheck {
            joiner: Joiner::Invitee,
            joiner_has_band: has_band(&mut *tx, invitee).await?,
            participants: participant_count(&mut *tx, pending.band_id).await?,
            quantity: band_quantity(&mut tx, pending.band_id).await?,
        })?;

        admit(
            &mut tx,
            PendingKind::Invite,
            id,
            &pending,
            invitee,
            is_full,
            MembershipError::AlreadyHasBand,
        )
        .await?;

        tx.commit().await?;
        info!(
            invite = %id,
            band = %pending.band_id,
            member = %invitee,
            is_full,
            "Invite accepted"
        );
        Ok(())
    }

    /// The invitee turns an invite down
    pub async fn decline_invite(&self, id: Uuid, invitee: Uuid) -> ApiResult<()> {
        decline(&self.pool, PendingKind::Invite, id, invitee).await
    }
}

async fn instrument_for(conn: &mut PgConnection, title: Option<&str>) -> ApiResult<Uuid> {
    let id = match title {
        Some(title) => find_instrument_id(conn, title).await?,
        None => None,
    };
    id.ok_or_else(|| ApiError::bad_request("Fill your instrument field correctly"))
}

async fn fetch_pending(
    conn: &mut PgConnection,
    kind: PendingKind,
    id: Uuid,
    lock: bool,
) -> ApiResult<Option<Pending>> {
    let query = format!(
        "SELECT band_id, author_id, user_id, instrument_id FROM {} WHERE id = $1{}",
        kind.table(),
        if lock { " FOR UPDATE" } else { "" }
    );
    let pending = sqlx::query_as::<_, Pending>(&query)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(pending)
}

/// Load a pending row addressed to `addressee`, then lock its band and the
/// row itself, in that order
async fn lock_pending(
    conn: &mut PgConnection,
    kind: PendingKind,
    id: Uuid,
    addressee: Uuid,
) -> ApiResult<Pending> {
    let pending = fetch_pending(&mut *conn, kind, id, false)
        .await?
        .ok_or_else(|| kind.not_found())?;
    if pending.user_id != addressee {
        return Err(kind.forbidden());
    }

    sqlx::query("SELECT id FROM bands WHERE id = $1 FOR UPDATE")
        .bind(pending.band_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ApiError::not_found("Band not found"))?;

    // A concurrent acceptance may have consumed the row while we waited
    fetch_pending(&mut *conn, kind, id, true)
        .await?
        .ok_or_else(|| kind.not_found())
}

async fn band_quantity(conn: &mut PgConnection, band_id: Uuid) -> ApiResult<i16> {
    let quantity = sqlx::query_scalar("SELECT quantity FROM bands WHERE id = $1")
        .bind(band_id)
        .fetch_one(conn)
        .await?;
    Ok(quantity)
}

/// Enrol the joiner, refresh `is_full` and consume the pending row
async fn admit(
    conn: &mut PgConnection,
    kind: PendingKind,
    id: Uuid,
    pending: &Pending,
    joiner: Uuid,
    is_full: bool,
    on_conflict: MembershipError,
) -> ApiResult<()> {
    enrol(
        &mut *conn,
        joiner,
        pending.band_id,
        pending.instrument_id,
        on_conflict,
    )
    .await?;

    sqlx::query("UPDATE bands SET is_full = $2 WHERE id = $1")
        .bind(pending.band_id)
        .bind(is_full)
        .execute(&mut *conn)
        .await?;

    sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn decline(pool: &PgPool, kind: PendingKind, id: Uuid, addressee: Uuid) -> ApiResult<()> {
    let mut conn = pool.acquire().await?;

    let pending = fetch_pending(&mut conn, kind, id, false)
        .await?
        .ok_or_else(|| kind.not_found())?;
    if pending.user_id != addressee {
        return Err(kind.forbidden());
    }

    sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
        .bind(id)
        .execute(&mut *conn)
        .await?;

    info!(
        id = %id,
        author = %pending.author_id,
        "Declined pending {}",
        kind.table()
    );
    Ok(())
}
