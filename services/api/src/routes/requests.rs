//! Join requests addressed to the caller's band

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
};

pub async fn list_requests(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let requests = state.membership_repository.list_requests(user.id).await?;
    Ok(Json(requests))
}

pub async fn get_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let request = state
        .membership_repository
        .find_request(id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Request not found"))?;
    Ok(Json(request))
}

/// Take the requester into the caller's band
pub async fn accept_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.membership_repository.accept_request(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn decline_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.membership_repository.decline_request(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
