//! Posts and the likes, reviews and bookmarks users attach to them

use axum::{
    Json,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
    media::{MediaKind, POST_AUDIOS, POST_IMAGES},
    middleware::AuthUser,
    models::{CreatePostRequest, PostResponse, ReviewRequest, ReviewResponse, UpdatePostRequest},
    permissions::Policy,
    repositories::post::{PostChanges, StoredMedia},
    validation::{MAX_REVIEW_LENGTH, check, validate_text, validate_title},
};

const REVIEW_FIELDS: [&str; 3] = ["text", "image", "audio"];

/// Decode and write an optional image and audio pair
async fn store_media(
    state: &AppState,
    image: Option<&str>,
    audio: Option<&str>,
) -> ApiResult<StoredMedia> {
    // Decode both before writing either so a bad audio leaves no orphan image
    let image = state.media_store.decode(MediaKind::Image, image)?;
    let audio = state.media_store.decode(MediaKind::Audio, audio)?;

    let mut stored = StoredMedia::default();
    if let Some(image) = image {
        stored.image = Some(state.media_store.save(POST_IMAGES, &image).await?);
    }
    if let Some(audio) = audio {
        match state.media_store.save(POST_AUDIOS, &audio).await {
            Ok(path) => stored.audio = Some(path),
            Err(e) => {
                state.media_store.discard(&stored.paths()).await;
                return Err(e);
            }
        }
    }
    Ok(stored)
}

async fn ensure_post(state: &AppState, id: Uuid) -> ApiResult<()> {
    if !state.post_repository.exists(id).await? {
        return Err(ApiError::not_found("Post not found"));
    }
    Ok(())
}

pub async fn list_posts(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let posts: Vec<PostResponse> = state
        .post_repository
        .list()
        .await?
        .into_iter()
        .map(PostResponse::from)
        .collect();
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .post_repository
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    Ok(Json(PostResponse::from(post)))
}

pub async fn create_post(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    ValidJson(payload): ValidJson<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    Policy::AuthorOrReadOnly.has_permission(&method, user.as_ref())?;
    let user = user.ok_or(ApiError::Unauthorized)?;

    check(validate_title(&payload.title))?;

    let media = store_media(&state, payload.image.as_deref(), payload.audio.as_deref()).await?;

    match state
        .post_repository
        .create(
            user.id,
            &payload.title,
            payload.text.as_deref(),
            &media,
            &payload.tags,
        )
        .await
    {
        Ok(post) => Ok((StatusCode::CREATED, Json(PostResponse::from(post)))),
        Err(e) => {
            state.media_store.discard(&media.paths()).await;
            Err(e)
        }
    }
}

async fn authorize(
    state: &AppState,
    method: &Method,
    user: Option<&AuthUser>,
    id: Uuid,
) -> ApiResult<()> {
    Policy::AuthorOrReadOnly.has_permission(method, user)?;

    let author = state
        .post_repository
        .author_of(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    Policy::AuthorOrReadOnly.has_object_permission(method, user, author)
}

/// PATCH and PUT both apply a partial update
pub async fn update_post(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<UpdatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &method, user.as_ref(), id).await?;

    if let Some(title) = &payload.title {
        check(validate_title(title))?;
    }

    let media = store_media(&state, payload.image.as_deref(), payload.audio.as_deref()).await?;
    let changes = PostChanges {
        title: payload.title,
        text: payload.text,
        media: media.clone(),
        tags: payload.tags,
    };

    match state.post_repository.update(id, &changes).await {
        Ok((post, replaced)) => {
            state.media_store.discard(&replaced.paths()).await;
            Ok(Json(PostResponse::from(post)))
        }
        Err(e) => {
            state.media_store.discard(&media.paths()).await;
            Err(e)
        }
    }
}

pub async fn delete_post(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    authorize(&state, &method, user.as_ref(), id).await?;

    let paths = state
        .post_repository
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    state.media_store.discard(&paths).await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn like(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    ensure_post(&state, id).await?;
    state.post_repository.like(id, user.id).await?;
    Ok((StatusCode::OK, Json("Your like was submitted")))
}

pub async fn unlike(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ensure_post(&state, id).await?;
    state.post_repository.unlike(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Parse a review body, rejecting any field other than text, image and audio
fn parse_review(body: Value) -> ApiResult<ReviewRequest> {
    if let Value::Object(fields) = &body {
        if fields.keys().any(|k| !REVIEW_FIELDS.contains(&k.as_str())) {
            return Err(ApiError::bad_request("Wrong field"));
        }
    }
    serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub async fn review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<Value>,
) -> ApiResult<impl IntoResponse> {
    let payload = parse_review(body)?;
    ensure_post(&state, id).await?;
    check(validate_text("text", &payload.text, MAX_REVIEW_LENGTH))?;

    let media = store_media(&state, payload.image.as_deref(), payload.audio.as_deref()).await?;

    match state
        .post_repository
        .create_review(id, user.id, &payload.text, &media)
        .await
    {
        Ok(review) => Ok((StatusCode::CREATED, Json(ReviewResponse::from(review)))),
        Err(e) => {
            state.media_store.discard(&media.paths()).await;
            Err(e)
        }
    }
}

pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ensure_post(&state, id).await?;

    let media = state
        .post_repository
        .delete_review(id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;
    state.media_store.discard(&media.paths()).await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn reviews(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    ensure_post(&state, id).await?;

    let reviews: Vec<ReviewResponse> = state
        .post_repository
        .reviews(id)
        .await?
        .into_iter()
        .map(ReviewResponse::from)
        .collect();
    Ok(Json(reviews))
}

pub async fn bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    ensure_post(&state, id).await?;
    let bookmark = state.post_repository.create_bookmark(user.id, id).await?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

pub async fn delete_bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ensure_post(&state, id).await?;

    if !state.post_repository.delete_bookmark(user.id, id).await? {
        return Err(ApiError::not_found("Bookmark not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's bookmarks
pub async fn bookmarks(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let bookmarks = state.post_repository.bookmarks(user.id).await?;
    Ok(Json(bookmarks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_review_rejects_foreign_fields() {
        let err = parse_review(json!({"text": "great", "rating": 5})).unwrap_err();
        assert_eq!(err.to_string(), "Bad request: Wrong field");
    }

    #[test]
    fn test_review_accepts_known_fields() {
        let review = parse_review(json!({"text": "great riff"})).unwrap();
        assert_eq!(review.text, "great riff");
        assert!(review.image.is_none());
        assert!(review.audio.is_none());
    }

    #[test]
    fn test_review_requires_text() {
        assert!(parse_review(json!({"image": null})).is_err());
    }
}
