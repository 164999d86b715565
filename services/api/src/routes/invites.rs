//! Invites addressed to the caller

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

pub async fn list_invites(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let invites = state.membership_repository.list_invites(user.id).await?;
    Ok(Json(invites))
}

pub async fn get_invite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let invite = state
        .membership_repository
        .find_invite(id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invite not found"))?;
    Ok(Json(invite))
}

/// Join the band the invite is for
pub async fn accept_invite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.membership_repository.accept_invite(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn decline_invite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.membership_repository.decline_invite(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
