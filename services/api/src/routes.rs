//! API service routes

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{middleware::auth_middleware, state::AppState};

mod auth;
mod bands;
mod catalog;
mod invites;
mod posts;
mod requests;
mod users;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/token/login/", post(auth::login))
        .route("/users/", get(users::list_users).post(users::create_user))
        .route("/users/me/", get(users::me))
        .route("/users/subscriptions/", get(users::subscriptions))
        .route(
            "/users/:id/",
            get(users::get_user)
                .patch(users::update_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/users/:id/invite_user/",
            post(users::invite_user).delete(users::cancel_invite),
        )
        .route(
            "/users/:id/follow/",
            post(users::follow).delete(users::unfollow),
        )
        .route("/invites/", get(invites::list_invites))
        .route(
            "/invites/:id/",
            get(invites::get_invite).delete(invites::decline_invite),
        )
        .route("/invites/:id/accept/", post(invites::accept_invite))
        .route("/bands/", get(bands::list_bands).post(bands::create_band))
        .route(
            "/bands/:id/",
            get(bands::get_band)
                .patch(bands::update_band)
                .put(bands::update_band)
                .delete(bands::delete_band),
        )
        .route(
            "/bands/:id/send_request/",
            post(bands::send_request).delete(bands::withdraw_request),
        )
        .route("/requests/", get(requests::list_requests))
        .route(
            "/requests/:id/",
            get(requests::get_request).delete(requests::decline_request),
        )
        .route("/requests/:id/accept/", post(requests::accept_request))
        .route("/posts/", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/:id/",
            get(posts::get_post)
                .patch(posts::update_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/:id/like/", post(posts::like).delete(posts::unlike))
        .route(
            "/posts/:id/review/",
            post(posts::review).delete(posts::delete_review),
        )
        .route("/posts/:id/reviews/", get(posts::reviews))
        .route(
            "/posts/:id/bookmark/",
            post(posts::bookmark).delete(posts::delete_bookmark),
        )
        .route("/bookmarks/", get(posts::bookmarks))
        .route(
            "/instrument_categories/",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/instrument_categories/:slug/",
            get(catalog::get_category)
                .patch(catalog::update_category)
                .put(catalog::update_category)
                .delete(catalog::delete_category),
        )
        .route(
            "/instruments/",
            get(catalog::list_instruments).post(catalog::create_instrument),
        )
        .route(
            "/instruments/:id/",
            get(catalog::get_instrument)
                .patch(catalog::update_instrument)
                .put(catalog::update_instrument)
                .delete(catalog::delete_instrument),
        )
        .route("/tags/", get(catalog::list_tags).post(catalog::create_tag))
        .route(
            "/tags/:slug/",
            get(catalog::get_tag)
                .patch(catalog::update_tag)
                .put(catalog::update_tag)
                .delete(catalog::delete_tag),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .nest_service("/media", ServeDir::new(state.media_store.root()))
        .layer(DefaultBodyLimit::max(state.media_store.body_limit()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}
