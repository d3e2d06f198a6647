/// Authentication extractors and utilities
use crate::{context::AppContext, error::ModerationError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token scope, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    User,
    Moderator,
    Admin,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Moderator => "moderator",
            Scope::Admin => "admin",
        }
    }

    pub fn can_review(&self) -> bool {
        *self >= Scope::Moderator
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub scope: Scope,
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub scope: Scope,
}

impl AuthContext {
    /// Fails unless the caller may make moderation decisions
    pub fn require_reviewer(&self) -> Result<(), ModerationError> {
        if self.scope.can_review() {
            Ok(())
        } else {
            Err(ModerationError::Authorization(
                "Moderator role required".to_string(),
            ))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ModerationError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            ModerationError::Authentication("Missing authorization header".to_string())
        })?;

        let claims = verify_jwt_token(&token, &state.config.authentication.jwt_secret)?;

        Ok(AuthContext {
            user_id: claims.sub,
            scope: claims.scope,
        })
    }
}

/// Caller with moderator or admin scope
#[derive(Debug, Clone)]
pub struct ReviewerContext {
    pub reviewer_id: String,
    pub scope: Scope,
}

#[async_trait]
impl FromRequestParts<AppContext> for ReviewerContext {
    type Rejection = ModerationError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;
        if let Err(e) = auth.require_reviewer() {
            tracing::warn!(user_id = %auth.user_id, "Non-reviewer attempted a moderation action");
            return Err(e);
        }

        Ok(ReviewerContext {
            reviewer_id: auth.user_id,
            scope: auth.scope,
        })
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Verify an HS256 token and return its claims
pub fn verify_jwt_token(token: &str, jwt_secret: &str) -> Result<Claims, ModerationError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (5 minutes)
    validation.leeway = 300;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("JWT verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ModerationError::Authentication("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    ModerationError::Authentication("Invalid token signature".to_string())
                }
                _ => ModerationError::Authentication(format!("Invalid token: {}", e)),
            }
        })
}

/// Sign a token for `subject`
pub fn issue_token(
    jwt_secret: &str,
    subject: &str,
    scope: Scope,
    ttl: Duration,
) -> Result<String, ModerationError> {
    let now = Utc::now();
    let claims = Claims {
        sub: subject.to_string(),
        scope,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| ModerationError::Internal(format!("Failed to sign token: {}", e)))
}
