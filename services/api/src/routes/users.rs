//! Users, follows and owner-sent invites

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
    extract::ValidJson,
    middleware::AuthUser,
    models::{CreateUserRequest, InstrumentChoice, UpdateUserRequest},
    validation::{check, validate_email, validate_password, validate_text, validate_username},
};

const MAX_NAME_LENGTH: usize = 150;

fn validate_names(first_name: Option<&str>, last_name: Option<&str>) -> ApiResult<()> {
    for (field, value) in [("first_name", first_name), ("last_name", last_name)] {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            check(validate_text(field, value, MAX_NAME_LENGTH))?;
        }
    }
    Ok(())
}

/// Register a new user
pub async fn create_user(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    check(validate_username(&payload.username))?;
    check(validate_email(&payload.email))?;
    check(validate_password(&payload.password))?;
    validate_names(Some(&payload.first_name), Some(&payload.last_name))?;

    let user = state.user_repository.create(&payload).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let users = state.user_repository.get_all().await?;
    Ok(Json(users))
}

/// The authenticated caller
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    let me = state
        .user_repository
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(me))
}

pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user))
}

fn ensure_self(user: &AuthUser, id: Uuid) -> ApiResult<()> {
    if user.id != id {
        return Err(ApiError::forbidden("You can only change your own account"));
    }
    Ok(())
}

pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    ensure_self(&user, id)?;

    if let Some(email) = &payload.email {
        check(validate_email(email))?;
    }
    if let Some(password) = &payload.password {
        check(validate_password(password))?;
    }
    validate_names(payload.first_name.as_deref(), payload.last_name.as_deref())?;

    let updated = state.user_repository.update(id, &payload).await?;
    Ok(Json(updated))
}

pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ensure_self(&user, id)?;

    if !state.user_repository.delete(id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!("User {} deleted their account", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Invite a user into the caller's band
pub async fn invite_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<InstrumentChoice>,
) -> ApiResult<impl IntoResponse> {
    let invite = state
        .membership_repository
        .invite(id, user.id, payload.instrument.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

pub async fn cancel_invite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.membership_repository.cancel_invite(id, user.id).await? {
        return Err(ApiError::not_found("Invite not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn follow(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.user_repository.exists(id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    let follow = state.user_repository.follow(user.id, id).await?;
    Ok((StatusCode::CREATED, Json(follow)))
}

pub async fn unfollow(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.user_repository.unfollow(user.id, id).await? {
        return Err(ApiError::not_found("You do not follow this user"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Users the caller follows
pub async fn subscriptions(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let users = state.user_repository.subscriptions(user.id).await?;
    Ok(Json(users))
}
