//! Band model and related payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::media::url_for;

/// Band row joined with its author's member details
#[derive(Debug, Clone, FromRow)]
pub struct BandRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub author_instrument: Option<String>,
    pub title: String,
    pub description: String,
    pub quantity: i16,
    pub is_full: bool,
    pub is_visible: bool,
    pub poster: Option<String>,
    pub pub_date: DateTime<Utc>,
}

/// A band participant and the instrument they play in it
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberResponse {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub instrument: Option<String>,
}

/// `is_visible` is accepted on input but never serialized
#[derive(Debug, Serialize)]
pub struct BandResponse {
    pub id: Uuid,
    pub author: MemberResponse,
    pub title: String,
    pub description: String,
    pub participants: Vec<MemberResponse>,
    pub quantity: i16,
    pub is_full: bool,
    pub pub_date: DateTime<Utc>,
    pub poster: Option<String>,
}

impl BandResponse {
    pub fn new(row: BandRow, participants: Vec<MemberResponse>) -> Self {
        BandResponse {
            id: row.id,
            author: MemberResponse {
                id: row.author_id,
                username: row.author_username,
                first_name: row.author_first_name,
                last_name: row.author_last_name,
                instrument: row.author_instrument,
            },
            title: row.title,
            description: row.description,
            participants,
            quantity: row.quantity,
            is_full: row.is_full,
            pub_date: row.pub_date,
            poster: url_for(row.poster),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBandRequest {
    pub title: String,
    pub description: String,
    pub quantity: i16,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    pub poster: Option<String>,
    /// Title of the instrument the creator plays in the band
    pub your_instrument: Option<String>,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBandRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i16>,
    pub is_visible: Option<bool>,
    pub poster: Option<String>,
}
