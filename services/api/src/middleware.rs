//! Authentication middleware for JWT token validation

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::ApiError,
    jwt::{ADMIN_ROLE, Claims},
    state::AppState,
};

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ADMIN_ROLE)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            id: claims.sub,
            roles: claims.roles,
        }
    }
}

/// Handlers taking `AuthUser` reject anonymous callers with 401;
/// `Option<AuthUser>` yields `None` instead.
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

/// Authentication middleware
///
/// A request without an `Authorization` header passes through anonymously.
/// A header that is not a valid bearer token is rejected with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if req.headers().contains_key(AUTHORIZATION) {
        let Authorization(bearer) = req
            .headers()
            .typed_get::<Authorization<Bearer>>()
            .ok_or(ApiError::Unauthorized)?;

        let claims = state
            .jwt_service
            .validate_token(bearer.token())
            .map_err(|e| {
                warn!("Rejected bearer token: {}", e);
                ApiError::Unauthorized
            })?;

        req.extensions_mut().insert(AuthUser::from(claims));
    }

    Ok(next.run(req).await)
}
