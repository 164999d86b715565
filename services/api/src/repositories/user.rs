//! User repository for database operations

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{CreateUserRequest, FollowResponse, UpdateUserRequest, User, UserResponse},
    repositories::{lock_member_bands, refresh_is_full, resolve_instruments},
};

const USER_SELECT: &str = r#"
    SELECT u.email, u.id, u.username, u.first_name, u.last_name,
           COALESCE(
               (SELECT array_agg(i.title ORDER BY i.title)
                FROM user_instruments ui
                JOIN instruments i ON i.id = ui.instrument_id
                WHERE ui.user_id = u.id),
               '{}'::text[]
           ) AS instruments
    FROM users u
"#;

/// Hash a password with Argon2 and a random salt
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            ApiError::InternalServerError
        })
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(password_hash: &str, password: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user together with the instruments they play
    pub async fn create(&self, new_user: &CreateUserRequest) -> ApiResult<UserResponse> {
        info!("Creating new user: {}", new_user.username);

        let password_hash = hash_password(&new_user.password)?;
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ApiError::unique_or(e, "A user with that username already exists"))?;

        replace_instruments(&mut *tx, id, &new_user.instruments).await?;
        let user = fetch_user(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Find a user by username, including the password hash
    pub async fn find_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, first_name, last_name, password_hash,
                   is_superuser, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get all users
    pub async fn get_all(&self) -> ApiResult<Vec<UserResponse>> {
        let users = sqlx::query_as::<_, UserResponse>(&format!(
            "{} ORDER BY u.username",
            USER_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<UserResponse>> {
        let user = sqlx::query_as::<_, UserResponse>(&format!("{} WHERE u.id = $1", USER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn exists(&self, id: Uuid) -> ApiResult<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Apply a partial update; absent fields keep their value
    pub async fn update(&self, id: Uuid, changes: &UpdateUserRequest) -> ApiResult<UserResponse> {
        let password_hash = changes
            .password
            .as_deref()
            .map(hash_password)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                password_hash = COALESCE($5, password_hash)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("User not found"));
        }

        if let Some(instruments) = &changes.instruments {
            replace_instruments(&mut *tx, id, instruments).await?;
        }

        let user = fetch_user(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(user)
    }

    /// Delete a user; everything they own cascades. The band they played in
    /// is locked first and its `is_full` recomputed once their seat is gone.
    pub async fn delete(&self, id: Uuid) -> ApiResult<bool> {
        let mut tx = self.pool.begin().await?;

        let bands = lock_member_bands(&mut *tx, "m.user_id = $1", id).await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        refresh_is_full(&mut *tx, &bands).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Start following another user
    pub async fn follow(&self, user_id: Uuid, author_id: Uuid) -> ApiResult<FollowResponse> {
        if user_id == author_id {
            return Err(ApiError::bad_request("You can not follow yourself"));
        }

        let follow = sqlx::query_as::<_, FollowResponse>(
            r#"
            INSERT INTO follows (user_id, author_id)
            VALUES ($1, $2)
            RETURNING id, user_id AS user, author_id AS author, created_at
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::unique_or(e, "You already follow this user"))?;

        Ok(follow)
    }

    pub async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> ApiResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Users the given user follows
    pub async fn subscriptions(&self, user_id: Uuid) -> ApiResult<Vec<UserResponse>> {
        let users = sqlx::query_as::<_, UserResponse>(&format!(
            "{} JOIN follows f ON f.author_id = u.id WHERE f.user_id = $1 ORDER BY f.created_at",
            USER_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

async fn fetch_user(conn: &mut PgConnection, id: Uuid) -> ApiResult<UserResponse> {
    let user = sqlx::query_as::<_, UserResponse>(&format!("{} WHERE u.id = $1", USER_SELECT))
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(user)
}

async fn replace_instruments(
    conn: &mut PgConnection,
    user_id: Uuid,
    titles: &[String],
) -> ApiResult<()> {
    let instrument_ids = resolve_instruments(conn, titles).await?;

    sqlx::query("DELETE FROM user_instruments WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO user_instruments (user_id, instrument_id) SELECT $1, unnest($2::uuid[])",
    )
    .bind(user_id)
    .bind(&instrument_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("user1234").unwrap();

        assert_ne!(hash, "user1234");
        assert!(verify_password(&hash, "user1234"));
        assert!(!verify_password(&hash, "user12345"));
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_password("mock_hash", "anything"));
    }
}
