//! Join requests and invites

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Body of `send_request` and `invite_user`
#[derive(Debug, Default, Deserialize)]
pub struct InstrumentChoice {
    /// Instrument title
    pub instrument: Option<String>,
}

/// A prospective member's request to join a band
///
/// `user` is the username of the band owner the request is addressed to.
#[derive(Debug, Serialize, FromRow)]
pub struct JoinRequestResponse {
    pub id: Uuid,
    pub user: String,
    pub band: Uuid,
    pub instrument: String,
    pub author: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A band owner's invitation; `band` is the band title
#[derive(Debug, Serialize, FromRow)]
pub struct InviteResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub band: String,
    pub instrument: String,
    pub author: Uuid,
    pub created_at: DateTime<Utc>,
}
