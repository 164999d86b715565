//! JWT service for access token generation and validation
//!
//! Tokens are signed with HS256 using the secret from [`JwtSettings`]. The
//! subject is the user id; administrators carry the `admin` role.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::{config::JwtSettings, models::User};

/// Role granted to superusers
pub const ADMIN_ROLE: &str = "admin";

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User roles
    pub roles: Vec<String>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_expiry: u64,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(settings: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        JwtService {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            access_token_expiry: settings.access_token_expiry,
        }
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user: &User) -> Result<String> {
        let now = now_secs()?;

        let roles = if user.is_superuser {
            vec![ADMIN_ROLE.to_string()]
        } else {
            vec![]
        };

        let claims = Claims {
            sub: user.id,
            roles,
            iat: now,
            exp: now + self.access_token_expiry,
        };

        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.access_token_expiry
    }
}

fn now_secs() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn service(secret: &str) -> JwtService {
        JwtService::new(&JwtSettings {
            secret: secret.to_string(),
            access_token_expiry: 900,
        })
    }

    fn user(is_superuser: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: "drummer".to_string(),
            email: "drummer@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            is_superuser,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_generated_token_validates() {
        let jwt = service("secret");
        let user = user(false);

        let token = jwt.generate_access_token(&user).unwrap();
        let claims = jwt.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert!(claims.roles.is_empty());
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_superuser_token_carries_admin_role() {
        let jwt = service("secret");
        let token = jwt.generate_access_token(&user(true)).unwrap();

        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.roles, vec![ADMIN_ROLE.to_string()]);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = service("one").generate_access_token(&user(false)).unwrap();
        assert!(service("two").validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = service("secret");
        let now = now_secs().unwrap();
        let token = jwt
            .encode_claims(&Claims {
                sub: Uuid::new_v4(),
                roles: vec![],
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();

        assert!(jwt.validate_token(&token).is_err());
    }
}
