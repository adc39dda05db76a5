//! Bearer token issuing and validation (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::Role;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Learner id
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl TokenService {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry: Duration::try_hours(expiry_hours).unwrap_or(Duration::MAX),
        }
    }

    /// Issue a token valid from `now`.
    pub fn issue(&self, learner_id: Uuid, role: Role, now: DateTime<Utc>) -> Result<(String, DateTime<Utc>)> {
        let expires_at = now
            .checked_add_signed(self.expiry)
            .ok_or_else(|| ApiError::Internal("Token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: learner_id,
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok((token, expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::Unauthorized("Token expired".to_string()),
                ErrorKind::InvalidSignature => ApiError::Unauthorized("Invalid token signature".to_string()),
                _ => ApiError::Unauthorized(format!("Invalid token: {}", e)),
            })
    }
}
