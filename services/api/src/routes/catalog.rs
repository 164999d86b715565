//! Admin-managed catalog: instrument categories, instruments, tags

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
    middleware::AuthUser,
    models::{InstrumentCategoryPayload, InstrumentPayload, TagPayload},
    permissions::Policy,
    validation::{check, required, validate_color, validate_slug, validate_title},
};

const DEFAULT_TAG_COLOR: &str = "#FFFFFF";

fn admin_only(method: &Method, user: &Option<AuthUser>) -> ApiResult<()> {
    Policy::AdminOrReadOnly.has_permission(method, user.as_ref())
}

fn validate_optional(
    value: Option<&str>,
    validator: fn(&str) -> Result<(), String>,
) -> ApiResult<()> {
    value.map(validator).transpose().map_err(ApiError::BadRequest)?;
    Ok(())
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.catalog_repository.list_categories().await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let category = state
        .catalog_repository
        .find_category(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Instrument category not found"))?;
    Ok(Json(category))
}

pub async fn create_category(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    ValidJson(payload): ValidJson<InstrumentCategoryPayload>,
) -> ApiResult<impl IntoResponse> {
    admin_only(&method, &user)?;

    let title = required(payload.title, "title")?;
    let slug = required(payload.slug, "slug")?;
    check(validate_title(&title))?;
    check(validate_slug(&slug))?;

    let category = state
        .catalog_repository
        .create_category(&title, &slug)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(slug): Path<String>,
    ValidJson(payload): ValidJson<InstrumentCategoryPayload>,
) -> ApiResult<impl IntoResponse> {
    admin_only(&method, &user)?;

    validate_optional(payload.title.as_deref(), validate_title)?;
    validate_optional(payload.slug.as_deref(), validate_slug)?;

    let category = state
        .catalog_repository
        .update_category(&slug, payload.title.as_deref(), payload.slug.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("Instrument category not found"))?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    admin_only(&method, &user)?;

    if !state.catalog_repository.delete_category(&slug).await? {
        return Err(ApiError::not_found("Instrument category not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_instruments(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.catalog_repository.list_instruments().await?))
}

pub async fn get_instrument(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let instrument = state
        .catalog_repository
        .find_instrument(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Instrument not found"))?;
    Ok(Json(instrument))
}

pub async fn create_instrument(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    ValidJson(payload): ValidJson<InstrumentPayload>,
) -> ApiResult<impl IntoResponse> {
    admin_only(&method, &user)?;

    let title = required(payload.title, "title")?;
    let category = required(payload.category, "category")?;
    check(validate_title(&title))?;

    let instrument = state
        .catalog_repository
        .create_instrument(&title, &category)
        .await?;
    Ok((StatusCode::CREATED, Json(instrument)))
}

pub async fn update_instrument(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<InstrumentPayload>,
) -> ApiResult<impl IntoResponse> {
    admin_only(&method, &user)?;

    validate_optional(payload.title.as_deref(), validate_title)?;

    let instrument = state
        .catalog_repository
        .update_instrument(id, payload.title.as_deref(), payload.category.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("Instrument not found"))?;
    Ok(Json(instrument))
}

pub async fn delete_instrument(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    admin_only(&method, &user)?;

    if !state.catalog_repository.delete_instrument(id).await? {
        return Err(ApiError::not_found("Instrument not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tags(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.catalog_repository.list_tags().await?))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let tag = state
        .catalog_repository
        .find_tag(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Tag not found"))?;
    Ok(Json(tag))
}

pub async fn create_tag(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    ValidJson(payload): ValidJson<TagPayload>,
) -> ApiResult<impl IntoResponse> {
    admin_only(&method, &user)?;

    let title = required(payload.title, "title")?;
    let slug = required(payload.slug, "slug")?;
    let color = payload
        .color
        .unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string());
    check(validate_title(&title))?;
    check(validate_slug(&slug))?;
    check(validate_color(&color))?;

    let tag = state
        .catalog_repository
        .create_tag(&title, &color, &slug)
        .await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn update_tag(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(slug): Path<String>,
    ValidJson(payload): ValidJson<TagPayload>,
) -> ApiResult<impl IntoResponse> {
    admin_only(&method, &user)?;

    validate_optional(payload.title.as_deref(), validate_title)?;
    validate_optional(payload.slug.as_deref(), validate_slug)?;
    validate_optional(payload.color.as_deref(), validate_color)?;

    let tag = state
        .catalog_repository
        .update_tag(
            &slug,
            payload.title.as_deref(),
            payload.color.as_deref(),
            payload.slug.as_deref(),
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Tag not found"))?;
    Ok(Json(tag))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    admin_only(&method, &user)?;

    if !state.catalog_repository.delete_tag(&slug).await? {
        return Err(ApiError::not_found("Tag not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
