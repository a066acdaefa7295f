//! HS256 access tokens.

use crate::auth::Authenticator;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tubely_core::constants::JWT_ISSUER;
use tubely_core::AppError;
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid, // user_id
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issues and validates access tokens signed with a shared secret.
#[derive(Clone)]
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[JWT_ISSUER]);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign an access token for `user_id`, valid for `expires_in`.
    pub fn issue(&self, user_id: Uuid, expires_in: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id,
            iss: JWT_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AppError> {
        let token_data =
            decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::Unauthorized("Token has expired".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                        AppError::Unauthorized("Invalid token issuer".to_string())
                    }
                    _ => AppError::Unauthorized("Couldn't validate JWT".to_string()),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Uuid, AppError> {
        Ok(self.validate_token(token)?.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-chars";

    #[tokio::test]
    async fn test_issue_then_authenticate() {
        let auth = JwtAuthenticator::new(SECRET);
        let user_id = Uuid::new_v4();
        let token = auth.issue(user_id, Duration::hours(1)).unwrap();

        assert_eq!(auth.authenticate(&token).await.unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        let token = auth.issue(Uuid::new_v4(), Duration::hours(-1)).unwrap();

        let err = auth.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref msg) if msg == "Token has expired"));
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let issuer = JwtAuthenticator::new("another-secret-that-is-32-chars-long");
        let token = issuer.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();

        let auth = JwtAuthenticator::new(SECRET);
        assert!(matches!(
            auth.authenticate(&token).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_issuer_rejected() {
        let claims = JwtClaims {
            sub: Uuid::new_v4(),
            iss: "someone-else".to_string(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = JwtAuthenticator::new(SECRET).validate_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref msg) if msg == "Invalid token issuer"));
    }

    #[tokio::test]
    async fn test_garbage_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        assert!(auth.authenticate("not-a-jwt").await.is_err());
    }
}
