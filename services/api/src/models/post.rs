//! Posts, reviews and bookmarks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::media::url_for;

/// Post row with its tag and like sets aggregated
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub title: String,
    pub author_id: Uuid,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub text: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub tags: Vec<Uuid>,
    pub likes: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub tags: Vec<Uuid>,
    pub author: Uuid,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub text: Option<String>,
    pub likes: Vec<Uuid>,
    pub pub_date: DateTime<Utc>,
}

impl From<PostRow> for PostResponse {
    fn from(row: PostRow) -> Self {
        PostResponse {
            id: row.id,
            title: row.title,
            tags: row.tags,
            author: row.author_id,
            image: url_for(row.image),
            audio: url_for(row.audio),
            text: row.text,
            likes: row.likes,
            pub_date: row.pub_date,
        }
    }
}

/// `image` and `audio` are base64 data URLs
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub tags: Option<Vec<Uuid>>,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub text: Option<String>,
}

/// Only these three fields may be sent when reviewing a post
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewRequest {
    pub text: String,
    pub image: Option<String>,
    pub audio: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub post: Uuid,
    pub author: Uuid,
    pub text: String,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub created: DateTime<Utc>,
}

impl From<ReviewRow> for ReviewResponse {
    fn from(row: ReviewRow) -> Self {
        ReviewResponse {
            id: row.id,
            post: row.post_id,
            author: row.author_id,
            text: row.text,
            image: url_for(row.image),
            audio: url_for(row.audio),
            created: row.created,
        }
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct BookmarkResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub post: Uuid,
}
