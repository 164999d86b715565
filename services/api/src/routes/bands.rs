//! Bands and join requests sent to them

use axum::{
    Json,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
    media::{BAND_POSTERS, MediaKind},
    middleware::AuthUser,
    models::{CreateBandRequest, InstrumentChoice, UpdateBandRequest},
    permissions::Policy,
    repositories::band::{BandChanges, NewBand},
    validation::{check, validate_text, validate_title},
};

const MAX_DESCRIPTION_LENGTH: usize = 5000;

fn viewer(user: &Option<AuthUser>) -> Option<Uuid> {
    user.as_ref().map(|u| u.id)
}

pub async fn list_bands(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let bands = state.band_repository.list(viewer(&user)).await?;
    Ok(Json(bands))
}

pub async fn get_band(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let band = state
        .band_repository
        .find(id, viewer(&user))
        .await?
        .ok_or_else(|| ApiError::not_found("Band not found"))?;
    Ok(Json(band))
}

/// Create a band with the caller as its first member
pub async fn create_band(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    ValidJson(payload): ValidJson<CreateBandRequest>,
) -> ApiResult<impl IntoResponse> {
    Policy::AuthorOrReadOnly.has_permission(&method, user.as_ref())?;
    let user = user.ok_or(ApiError::Unauthorized)?;

    check(validate_title(&payload.title))?;
    check(validate_text(
        "description",
        &payload.description,
        MAX_DESCRIPTION_LENGTH,
    ))?;

    let poster = state
        .media_store
        .store(MediaKind::Image, BAND_POSTERS, payload.poster.as_deref())
        .await?;

    let new_band = NewBand {
        title: &payload.title,
        description: &payload.description,
        quantity: payload.quantity,
        is_visible: payload.is_visible,
        poster: poster.clone(),
        instrument: payload.your_instrument.as_deref(),
    };

    match state.band_repository.create(user.id, &new_band).await {
        Ok(band) => Ok((StatusCode::CREATED, Json(band))),
        Err(e) => {
            state.media_store.discard(&[poster]).await;
            Err(e)
        }
    }
}

/// Load the band's author and check the caller may modify it
async fn authorize(
    state: &AppState,
    method: &Method,
    user: Option<&AuthUser>,
    id: Uuid,
) -> ApiResult<AuthUser> {
    Policy::AuthorOrReadOnly.has_permission(method, user)?;
    let user = user.cloned().ok_or(ApiError::Unauthorized)?;

    let author = state
        .band_repository
        .author_of(id, Some(user.id))
        .await?
        .ok_or_else(|| ApiError::not_found("Band not found"))?;
    Policy::AuthorOrReadOnly.has_object_permission(method, Some(&user), author)?;

    Ok(user)
}

/// PATCH and PUT both apply a partial update
pub async fn update_band(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<UpdateBandRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = authorize(&state, &method, user.as_ref(), id).await?;

    if let Some(title) = &payload.title {
        check(validate_title(title))?;
    }
    if let Some(description) = &payload.description {
        check(validate_text("description", description, MAX_DESCRIPTION_LENGTH))?;
    }

    let poster = state
        .media_store
        .store(MediaKind::Image, BAND_POSTERS, payload.poster.as_deref())
        .await?;

    let changes = BandChanges {
        title: payload.title,
        description: payload.description,
        quantity: payload.quantity,
        is_visible: payload.is_visible,
        poster: poster.clone(),
    };

    match state.band_repository.update(id, user.id, &changes).await {
        Ok((band, replaced)) => {
            state.media_store.discard(&[replaced]).await;
            Ok(Json(band))
        }
        Err(e) => {
            state.media_store.discard(&[poster]).await;
            Err(e)
        }
    }
}

pub async fn delete_band(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    authorize(&state, &method, user.as_ref(), id).await?;

    let poster = state
        .band_repository
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Band not found"))?;
    state.media_store.discard(&[poster]).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Ask to join a band
pub async fn send_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<InstrumentChoice>,
) -> ApiResult<impl IntoResponse> {
    let request = state
        .membership_repository
        .send_request(id, user.id, payload.instrument.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Withdraw the caller's pending request to a band
pub async fn withdraw_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.membership_repository.withdraw_request(id, user.id).await? {
        return Err(ApiError::not_found("Request not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
