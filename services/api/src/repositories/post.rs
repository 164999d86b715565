//! Posts and what users attach to them: likes, reviews, bookmarks

use common::error::DatabaseError;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{BookmarkResponse, PostRow, ReviewRow},
};

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.author_id, p.image, p.audio, p.text, p.pub_date,
           COALESCE(
               (SELECT array_agg(pt.tag_id) FROM post_tags pt WHERE pt.post_id = p.id),
               '{}'::uuid[]
           ) AS tags,
           COALESCE(
               (SELECT array_agg(pl.user_id) FROM post_likes pl WHERE pl.post_id = p.id),
               '{}'::uuid[]
           ) AS likes
    FROM posts p
"#;

const REVIEW_COLUMNS: &str = "id, post_id, author_id, text, image, audio, created";

/// Relative media paths already written to the media store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredMedia {
    pub image: Option<String>,
    pub audio: Option<String>,
}

impl StoredMedia {
    pub fn paths(self) -> Vec<Option<String>> {
        vec![self.image, self.audio]
    }
}

/// Changes to an existing post; `None` keeps the current value
#[derive(Debug, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub text: Option<String>,
    pub media: StoredMedia,
    pub tags: Option<Vec<Uuid>>,
}

#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All posts, newest first
    pub async fn list(&self) -> ApiResult<Vec<PostRow>> {
        let posts = sqlx::query_as::<_, PostRow>(&format!(
            "{} ORDER BY p.pub_date DESC",
            POST_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    pub async fn find(&self, id: Uuid) -> ApiResult<Option<PostRow>> {
        let post = sqlx::query_as::<_, PostRow>(&format!("{} WHERE p.id = $1", POST_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    /// Author of a post, `None` if the post does not exist
    pub async fn author_of(&self, id: Uuid) -> ApiResult<Option<Uuid>> {
        let author = sqlx::query_scalar("SELECT author_id FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(author)
    }

    pub async fn exists(&self, id: Uuid) -> ApiResult<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        title: &str,
        text: Option<&str>,
        media: &StoredMedia,
        tags: &[Uuid],
    ) -> ApiResult<PostRow> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO posts (title, author_id, image, audio, text)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(title)
        .bind(author_id)
        .bind(&media.image)
        .bind(&media.audio)
        .bind(text)
        .fetch_one(&mut *tx)
        .await?;

        replace_tags(&mut *tx, id, tags).await?;
        let post = fetch_post(&mut *tx, id).await?;

        tx.commit().await?;
        info!("User {} published post {}", author_id, id);
        Ok(post)
    }

    /// Apply changes, returning the updated post and the media it replaced
    pub async fn update(
        &self,
        id: Uuid,
        changes: &PostChanges,
    ) -> ApiResult<(PostRow, StoredMedia)> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<(Option<String>, Option<String>)> =
            sqlx::query_as("SELECT image, audio FROM posts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let (old_image, old_audio) =
            previous.ok_or_else(|| ApiError::not_found("Post not found"))?;

        sqlx::query(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                text = COALESCE($3, text),
                image = COALESCE($4, image),
                audio = COALESCE($5, audio)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.text)
        .bind(&changes.media.image)
        .bind(&changes.media.audio)
        .execute(&mut *tx)
        .await?;

        if let Some(tags) = &changes.tags {
            replace_tags(&mut *tx, id, tags).await?;
        }

        let post = fetch_post(&mut *tx, id).await?;
        tx.commit().await?;

        let replaced = StoredMedia {
            image: old_image.filter(|_| changes.media.image.is_some()),
            audio: old_audio.filter(|_| changes.media.audio.is_some()),
        };
        Ok((post, replaced))
    }

    /// Delete a post, returning every media path it and its reviews held
    pub async fn delete(&self, id: Uuid) -> ApiResult<Option<Vec<Option<String>>>> {
        let mut tx = self.pool.begin().await?;

        let mut paths: Vec<Option<String>> = sqlx::query_as::<_, (Option<String>, Option<String>)>(
            "SELECT image, audio FROM reviews WHERE post_id = $1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .flat_map(|(image, audio)| [image, audio])
        .collect();

        let deleted: Option<(Option<String>, Option<String>)> =
            sqlx::query_as("DELETE FROM posts WHERE id = $1 RETURNING image, audio")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((image, audio)) = deleted else {
            return Ok(None);
        };
        tx.commit().await?;

        paths.push(image);
        paths.push(audio);
        Ok(Some(paths))
    }

    /// Adding a like twice is a no-op
    pub async fn like(&self, post_id: Uuid, user_id: Uuid) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn unlike(&self, post_id: Uuid, user_id: Uuid) -> ApiResult<()> {
        sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn create_review(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        text: &str,
        media: &StoredMedia,
    ) -> ApiResult<ReviewRow> {
        sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            INSERT INTO reviews (post_id, author_id, text, image, audio)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .bind(&media.image)
        .bind(&media.audio)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| attach_error(e, "You have already reviewed this post"))
    }

    /// Remove the caller's review of a post, returning its media
    pub async fn delete_review(
        &self,
        post_id: Uuid,
        author_id: Uuid,
    ) -> ApiResult<Option<StoredMedia>> {
        let deleted: Option<(Option<String>, Option<String>)> = sqlx::query_as(
            "DELETE FROM reviews WHERE post_id = $1 AND author_id = $2 RETURNING image, audio",
        )
        .bind(post_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(deleted.map(|(image, audio)| StoredMedia { image, audio }))
    }

    pub async fn reviews(&self, post_id: Uuid) -> ApiResult<Vec<ReviewRow>> {
        let reviews = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {} FROM reviews WHERE post_id = $1 ORDER BY created DESC",
            REVIEW_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    pub async fn create_bookmark(
        &self,
        user_id: Uuid,
        post_id: Uuid,
    ) -> ApiResult<BookmarkResponse> {
        sqlx::query_as::<_, BookmarkResponse>(
            r#"
            INSERT INTO bookmarks (user_id, post_id)
            VALUES ($1, $2)
            RETURNING id, user_id AS user, post_id AS post
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| attach_error(e, "This post is already in your bookmarks"))
    }

    pub async fn delete_bookmark(&self, user_id: Uuid, post_id: Uuid) -> ApiResult<bool> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn bookmarks(&self, user_id: Uuid) -> ApiResult<Vec<BookmarkResponse>> {
        let bookmarks = sqlx::query_as::<_, BookmarkResponse>(
            r#"
            SELECT id, user_id AS user, post_id AS post
            FROM bookmarks
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookmarks)
    }
}

/// Errors of rows hanging off a post: the post vanished, or the row exists
fn attach_error(err: sqlx::Error, duplicate: &str) -> ApiError {
    let err = DatabaseError::from(err);
    if err.is_foreign_key_violation() {
        ApiError::not_found("Post not found")
    } else {
        ApiError::unique_or(err, duplicate)
    }
}

async fn fetch_post(conn: &mut PgConnection, id: Uuid) -> ApiResult<PostRow> {
    let post = sqlx::query_as::<_, PostRow>(&format!("{} WHERE p.id = $1", POST_SELECT))
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(post)
}

/// Replace a post's tag set; every id must name an existing tag
async fn replace_tags(conn: &mut PgConnection, post_id: Uuid, tags: &[Uuid]) -> ApiResult<()> {
    let mut unique = tags.to_vec();
    unique.sort();
    unique.dedup();

    let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
        .bind(&unique)
        .fetch_one(&mut *conn)
        .await?;
    if known != unique.len() as i64 {
        return Err(ApiError::bad_request("Unknown tag"));
    }

    sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("INSERT INTO post_tags (post_id, tag_id) SELECT $1, unnest($2::uuid[])")
        .bind(post_id)
        .bind(&unique)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
