//! Bearer token validation.
//!
//! Tokens are HS256-signed JWTs issued by the identity provider with the
//! shared `MENTORLINE_JWT_SECRET`. The engine only validates them and turns
//! the claims into a [`Principal`]; `issue_token` exists for the admin CLI
//! and tests.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mentorline_types::identity::{Principal, Role};

/// Default lifetime of tokens minted by `issue_token`.
pub const DEFAULT_TOKEN_EXPIRY_MINS: i64 = 60;

/// JWT claims carried by every bearer token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's id.
    pub sub: Uuid,
    pub role: Role,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier.
    pub jti: String,
}

impl From<&Claims> for Principal {
    fn from(claims: &Claims) -> Self {
        Principal::new(claims.sub, claims.role)
    }
}

/// Signing secret shared with the identity provider.
#[derive(Clone)]
pub struct JwtConfig {
    secret: SecretString,
    pub token_expiry_mins: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("token_expiry_mins", &self.token_expiry_mins)
            .finish()
    }
}

impl JwtConfig {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            token_expiry_mins: DEFAULT_TOKEN_EXPIRY_MINS,
        }
    }

    /// Load the secret from `MENTORLINE_JWT_SECRET`.
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("MENTORLINE_JWT_SECRET").map_err(|_| {
            anyhow::anyhow!("MENTORLINE_JWT_SECRET must be set to validate bearer tokens")
        })?;
        if secret.trim().is_empty() {
            anyhow::bail!("MENTORLINE_JWT_SECRET must not be empty");
        }
        Ok(Self::new(SecretString::from(secret)))
    }
}

/// Mint a token for `user_id` with `role`.
pub fn issue_token(
    user_id: Uuid,
    role: Role,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role,
        exp: now + config.token_expiry_mins * 60,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.expose_secret().as_bytes()),
    )
}

/// Validate signature and expiry and return the claims.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.expose_secret().as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig::new(SecretString::from(secret.to_string()))
    }

    #[test]
    fn test_issue_and_validate() {
        let cfg = config("test-secret");
        let user = Uuid::now_v7();
        let token = issue_token(user, Role::Mentor, &cfg).unwrap();

        let claims = validate_token(&token, &cfg).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Mentor);

        let principal = Principal::from(&claims);
        assert_eq!(principal.user_id, user);
        assert!(!principal.is_admin());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(Uuid::now_v7(), Role::Student, &config("one")).unwrap();
        assert!(validate_token(&token, &config("two")).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut cfg = config("test-secret");
        cfg.token_expiry_mins = -10;
        let token = issue_token(Uuid::now_v7(), Role::Student, &cfg).unwrap();
        assert!(validate_token(&token, &cfg).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", config("very-private"));
        assert!(!rendered.contains("very-private"));
    }
}
