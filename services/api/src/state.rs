//! Application state shared across handlers

use sqlx::PgPool;

use crate::{
    config::AppConfig,
    jwt::JwtService,
    media::MediaStore,
    repositories::{
        BandRepository, CatalogRepository, MembershipRepository, PostRepository, UserRepository,
    },
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub media_store: MediaStore,
    pub user_repository: UserRepository,
    pub catalog_repository: CatalogRepository,
    pub post_repository: PostRepository,
    pub band_repository: BandRepository,
    pub membership_repository: MembershipRepository,
}

impl AppState {
    pub fn new(pool: PgPool, config: &AppConfig) -> Self {
        Self {
            jwt_service: JwtService::new(&config.jwt),
            media_store: MediaStore::new(&config.media.root, config.media.max_upload_bytes),
            user_repository: UserRepository::new(pool.clone()),
            catalog_repository: CatalogRepository::new(pool.clone()),
            post_repository: PostRepository::new(pool.clone()),
            band_repository: BandRepository::new(pool.clone()),
            membership_repository: MembershipRepository::new(pool.clone()),
            db_pool: pool,
        }
    }
}
