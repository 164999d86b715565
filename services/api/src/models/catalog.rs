//! Instrument categories, instruments and tags

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InstrumentCategory {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

/// Instrument as exposed by the API; `category` is the category title
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Instrument {
    pub id: Uuid,
    pub title: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub title: String,
    pub color: String,
    pub slug: String,
}

/// Create or update payload; on create every field is required
#[derive(Debug, Default, Deserialize)]
pub struct InstrumentCategoryPayload {
    pub title: Option<String>,
    pub slug: Option<String>,
}

/// `category` refers to an instrument category by slug
#[derive(Debug, Default, Deserialize)]
pub struct InstrumentPayload {
    pub title: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TagPayload {
    pub title: Option<String>,
    pub color: Option<String>,
    pub slug: Option<String>,
}
