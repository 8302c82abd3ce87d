//! Authentication Service
//!
//! Verifies the bearer tokens issued by the forum's login endpoint. The chat
//! subsystem refuses to upgrade a connection without a verified identity.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::domain::UserRole;
use crate::shared::error::AppError;

/// JWT claims structure, as issued by the forum
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user ID
    pub user_id: i64,
    /// Role name ("user" or "admin")
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// A verified identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub role: UserRole,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(msg) => AppError::Internal(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

/// HS256 token verifier sharing the forum's secret
#[derive(Clone)]
pub struct TokenVerifier {
    settings: JwtSettings,
}

impl TokenVerifier {
    pub fn new(settings: JwtSettings) -> Self {
        Self { settings }
    }

    /// Verify a bearer token and return the identity it carries.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        if token_data.claims.user_id <= 0 {
            return Err(AuthError::InvalidToken);
        }

        Ok(AuthenticatedUser {
            user_id: token_data.claims.user_id,
            role: UserRole::from_str(&token_data.claims.role),
        })
    }

    /// Mint a token with the forum's claim shape.
    pub fn issue(&self, user_id: i64, role: &UserRole) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            role: role.as_str().to_string(),
            exp: (now + Duration::hours(self.settings.token_expiry_hours)).timestamp(),
            iat: Some(now.timestamp()),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
    }
}
