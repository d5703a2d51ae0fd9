use std::env;
use std::time::{Duration as StdDuration, SystemTime};

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use crate::auth::revocation::RevocationList;
use crate::entities::Role;

const DEV_SECRET: &str = "fit-coach-development-secret";

/// Security errors for authentication and token operations
#[derive(Debug, Error)]
pub enum SecurityError {
    /// JWT validation error
    #[error("Token validation error: {0}")]
    TokenValidation(String),

    /// Expired token
    #[error("Token has expired")]
    TokenExpired,

    /// Invalid token structure
    #[error("Invalid token format")]
    InvalidToken,

    /// Access token presented where a refresh token is needed, or the reverse
    #[error("Wrong token type")]
    WrongTokenType,

    /// Token has been revoked
    #[error("Token has been revoked")]
    TokenRevoked,

    /// Configuration error
    #[error("Security configuration error: {0}")]
    ConfigError(String),
}

/// Token types for authentication
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token
    Access,
    /// Long-lived refresh token
    Refresh,
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub role: Role,
    pub iss: String,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Issued at, unix millis; revocation is checked against this
    #[serde(default)]
    pub iat_ms: i64,
    pub exp: i64,
    pub token_type: TokenType,
}

/// Access/refresh pair returned on login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Signing configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            access_ttl: Duration::minutes(60),
            refresh_ttl: Duration::days(7),
        }
    }

    /// Read `JWT_SECRET`, `JWT_ISSUER`, `ACCESS_TOKEN_EXPIRATION_MINUTES` and
    /// `REFRESH_TOKEN_EXPIRATION_DAYS`. Outside development a secret is required.
    pub fn from_env() -> Result<Self, SecurityError> {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if app_env == "development" => {
                warn!("JWT_SECRET not set; using the development secret");
                DEV_SECRET.to_string()
            }
            _ => {
                error!("JWT_SECRET environment variable not found");
                return Err(SecurityError::ConfigError(
                    "JWT_SECRET environment variable not found".to_string(),
                ));
            }
        };

        let issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "fit-coach-api".to_string());

        let access_minutes = env::var("ACCESS_TOKEN_EXPIRATION_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(60);

        let refresh_days = env::var("REFRESH_TOKEN_EXPIRATION_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(7);

        Ok(Self {
            secret,
            issuer,
            access_ttl: Duration::minutes(access_minutes),
            refresh_ttl: Duration::days(refresh_days),
        })
    }

    fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }
}

/// Issues and validates tokens, and tracks logouts
#[derive(Debug)]
pub struct TokenService {
    config: TokenConfig,
    revocations: RevocationList,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        Self {
            config,
            revocations: RevocationList::new(),
        }
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.config.access_ttl.num_seconds()
    }

    /// Generate a signed token
    pub fn issue(&self, user_id: &str, role: Role, token_type: TokenType) -> Result<String, SecurityError> {
        let now = Utc::now();
        let expiration = now + self.config.ttl(token_type);

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            iat_ms: now.timestamp_millis(),
            exp: expiration.timestamp(),
            token_type,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(|e| {
            error!("Failed to encode JWT token: {}", e);
            SecurityError::TokenValidation(e.to_string())
        })?;

        debug!("Generated {:?} token for user {}, expires {}", token_type, user_id, expiration);
        Ok(token)
    }

    pub fn issue_pair(&self, user_id: &str, role: Role) -> Result<TokenPair, SecurityError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, role, TokenType::Access)?,
            refresh_token: self.issue(user_id, role, TokenType::Refresh)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl_seconds(),
        })
    }

    /// Validate signature, issuer, expiry, type and revocation
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, SecurityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_issuer(&[self.config.issuer.as_str()]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidToken => SecurityError::InvalidToken,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                SecurityError::TokenValidation("Invalid signature".to_string())
            }
            _ => SecurityError::TokenValidation(e.to_string()),
        })?;

        let claims = token_data.claims;
        if claims.token_type != expected {
            return Err(SecurityError::WrongTokenType);
        }

        let issued_at_ms = if claims.iat_ms > 0 { claims.iat_ms } else { claims.iat * 1000 };
        if self.revocations.is_revoked(&claims.sub, issued_at_ms) {
            return Err(SecurityError::TokenRevoked);
        }

        Ok(claims)
    }

    /// Revoke every token issued to the user until now
    pub fn revoke_all(&self, user_id: &str) {
        info!("Revoking tokens for user {}", user_id);
        let ttl = self.config.refresh_ttl.num_seconds().max(0) as u64;
        let expires_at = SystemTime::now() + StdDuration::from_secs(ttl);
        self.revocations.revoke(user_id, Utc::now().timestamp_millis(), expires_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(TokenConfig::new("test_secret_key_for_testing_only", "test-issuer"))
    }

    #[test]
    fn test_issue_and_validate() {
        let tokens = service();
        let token = tokens.issue("user-123", Role::Coach, TokenType::Access).unwrap();
        assert!(!token.is_empty());

        let claims = tokens.validate(&token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.role, Role::Coach);
        assert_eq!(claims.iss, "test-issuer");
    }

    #[test]
    fn test_token_type_is_enforced() {
        let tokens = service();
        let pair = tokens.issue_pair("user-1", Role::Client).unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert!(matches!(
            tokens.validate(&pair.refresh_token, TokenType::Access),
            Err(SecurityError::WrongTokenType)
        ));
        assert!(tokens.validate(&pair.refresh_token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn test_expired_token() {
        let tokens = service();
        let now = Utc::now();
        let claims = Claims {
            sub: "user-456".to_string(),
            role: Role::Client,
            iss: "test-issuer".to_string(),
            iat: now.timestamp() - 7200,
            iat_ms: (now.timestamp() - 7200) * 1000,
            exp: now.timestamp() - 3600,
            token_type: TokenType::Access,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test_secret_key_for_testing_only"),
        )
        .unwrap();

        assert!(matches!(tokens.validate(&token, TokenType::Access), Err(SecurityError::TokenExpired)));
    }

    #[test]
    fn test_wrong_issuer_or_secret() {
        let tokens = service();
        let other = TokenService::new(TokenConfig::new("another-secret", "test-issuer"));
        let token = other.issue("user-1", Role::Coach, TokenType::Access).unwrap();
        assert!(tokens.validate(&token, TokenType::Access).is_err());

        let other_issuer = TokenService::new(TokenConfig::new("test_secret_key_for_testing_only", "elsewhere"));
        let token = other_issuer.issue("user-1", Role::Coach, TokenType::Access).unwrap();
        assert!(tokens.validate(&token, TokenType::Access).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let result = service().validate("invalid.token.format", TokenType::Access);
        assert!(matches!(
            result,
            Err(SecurityError::InvalidToken) | Err(SecurityError::TokenValidation(_))
        ));
    }

    #[test]
    fn test_revoke_all_rejects_earlier_tokens_only() {
        let tokens = service();
        let before = tokens.issue("user-1", Role::Client, TokenType::Access).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        tokens.revoke_all("user-1");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let after = tokens.issue("user-1", Role::Client, TokenType::Access).unwrap();

        assert!(matches!(tokens.validate(&before, TokenType::Access), Err(SecurityError::TokenRevoked)));
        assert!(tokens.validate(&after, TokenType::Access).is_ok());
    }
}
