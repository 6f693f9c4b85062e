use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

/// Claim set this platform issues and consumes.
///
/// `tenant_id` binds the session to one tenant; platform admins carry an
/// empty string here and are admitted only by the resolver's narrow
/// role-plus-path bypass.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub tenant_id: String,
    pub user: String,
    pub role: String,
    pub user_id: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(tenant_id: String, user: String, role: String, user_id: Uuid) -> Self {
        let now = Utc::now();
        let expiry = Duration::hours(config::config().security.jwt_expiry_hours as i64);
        Self {
            tenant_id,
            user,
            role,
            user_id,
            exp: (now + expiry).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("JWT secret is not configured")]
    MissingSecret,
}

/// Sign a claim set with the configured secret.
pub fn generate_jwt(claims: Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    #[test]
    fn signed_tokens_round_trip_with_the_configured_secret() {
        let claims = Claims::new(
            "a3b8c2d1-4e5f-4a6b-8c7d-9e0f1a2b3c4d".to_string(),
            "agent@example".to_string(),
            "agent".to_string(),
            Uuid::new_v4(),
        );
        let user_id = claims.user_id;
        let token = generate_jwt(claims).unwrap();

        let secret = &config::config().security.jwt_secret;
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(
            decoded.claims.tenant_id,
            "a3b8c2d1-4e5f-4a6b-8c7d-9e0f1a2b3c4d"
        );
        assert_eq!(decoded.claims.role, "agent");
        assert_eq!(decoded.claims.user_id, user_id);
        assert!(decoded.claims.exp > decoded.claims.iat);
    }
}
