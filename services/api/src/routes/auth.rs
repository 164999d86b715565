//! Token login

use axum::{Json, extract::State};
use tracing::{error, info, warn};

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
    models::{LoginRequest, TokenResponse},
    repositories::user::verify_password,
};

/// Exchange a username and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user = state
        .user_repository
        .find_by_username(&payload.username)
        .await?
        .filter(|user| verify_password(&user.password_hash, &payload.password))
        .ok_or_else(|| {
            warn!("Failed login attempt for {}", payload.username);
            ApiError::Unauthorized
        })?;

    let access_token = state
        .jwt_service
        .generate_access_token(&user)
        .map_err(|e| {
            error!("Failed to issue access token: {}", e);
            ApiError::InternalServerError
        })?;

    info!("User {} logged in", user.id);

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    }))
}
