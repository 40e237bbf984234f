use crate::error::{AuthError, Result};
use chrono::{Duration, Utc};
use gymdesk_models::{User, UserRole};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by access tokens. The request gate reads identity and role
/// from here without touching the database.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    pub sub: String,            // User ID
    pub username: String,
    pub role: UserRole,
    pub session_id: String,
    pub token_type: TokenType,  // always Access
    pub exp: i64,               // Expiration time
    pub iat: i64,               // Issued at
    pub jti: String,            // JWT ID (unique identifier)
}

/// Claims carried by refresh tokens. No role: the role is re-read from the
/// user row when the token is redeemed.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub username: String,
    pub session_id: String,
    pub token_type: TokenType,  // always Refresh
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl AccessClaims {
    // Serde guarantees the fields exist; this rejects hollow values
    fn check_payload(&self) -> Result<()> {
        if self.sub.is_empty() || self.username.is_empty() || self.session_id.is_empty() {
            return Err(AuthError::InvalidToken(
                "Token payload is incomplete".to_string(),
            ));
        }
        Ok(())
    }
}

impl RefreshClaims {
    fn check_payload(&self) -> Result<()> {
        if self.sub.is_empty() || self.username.is_empty() || self.session_id.is_empty() {
            return Err(AuthError::InvalidToken(
                "Token payload is incomplete".to_string(),
            ));
        }
        Ok(())
    }
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

pub struct JwtService {
    access_keys: KeyPair,
    refresh_keys: KeyPair,
    algorithm: Algorithm,
    access_token_exp_hours: i64,
    refresh_token_exp_days: i64,
}

impl JwtService {
    /// Build a service from the two signing secrets. The secrets are for
    /// independent key domains and must not be equal, otherwise a refresh
    /// token could be replayed where an access token is expected.
    pub fn new(access_secret: &str, refresh_secret: &str) -> Result<Self> {
        if access_secret.is_empty() || refresh_secret.is_empty() {
            return Err(AuthError::ConfigurationError(
                "Token secrets must not be empty".to_string(),
            ));
        }

        if access_secret == refresh_secret {
            return Err(AuthError::ConfigurationError(
                "Access and refresh token secrets must differ".to_string(),
            ));
        }

        Ok(Self {
            access_keys: KeyPair::from_secret(access_secret),
            refresh_keys: KeyPair::from_secret(refresh_secret),
            algorithm: Algorithm::HS256,
            access_token_exp_hours: 1,   // 1 hour default
            refresh_token_exp_days: 7,   // 7 days default
        })
    }

    pub fn from_env() -> Result<Self> {
        let access_secret = std::env::var("ACCESS_TOKEN_SECRET").map_err(|_| {
            AuthError::ConfigurationError("ACCESS_TOKEN_SECRET must be set".to_string())
        })?;

        let refresh_secret = std::env::var("REFRESH_TOKEN_SECRET").map_err(|_| {
            AuthError::ConfigurationError("REFRESH_TOKEN_SECRET must be set".to_string())
        })?;

        let mut service = Self::new(&access_secret, &refresh_secret)?;

        service.access_token_exp_hours = std::env::var("ACCESS_TOKEN_EXPIRATION_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        service.refresh_token_exp_days = std::env::var("REFRESH_TOKEN_EXPIRATION_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7);

        Ok(service)
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_token_exp_hours * 3600
    }

    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_token_exp_days * 86400
    }

    /// Generate an access token bound to a session
    pub fn generate_access_token(&self, user: &User, session_id: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.access_token_exp_hours);

        let claims = AccessClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            session_id: session_id.to_string(),
            token_type: TokenType::Access,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.access_keys.encoding)?;
        Ok(token)
    }

    /// Generate a refresh token bound to a session
    pub fn generate_refresh_token(&self, user: &User, session_id: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::days(self.refresh_token_exp_days);

        let claims = RefreshClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            session_id: session_id.to_string(),
            token_type: TokenType::Refresh,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.refresh_keys.encoding)?;
        Ok(token)
    }

    /// Validate an access token: signature, expiry and token type
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims> {
        let validation = Validation::new(self.algorithm);
        let token_data = decode::<AccessClaims>(token, &self.access_keys.decoding, &validation)?;

        if token_data.claims.token_type != TokenType::Access {
            return Err(AuthError::InvalidToken(
                "Token is not an access token".to_string(),
            ));
        }

        token_data.claims.check_payload()?;

        Ok(token_data.claims)
    }

    /// Validate a refresh token: signature, expiry and token type
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims> {
        let validation = Validation::new(self.algorithm);
        let token_data = decode::<RefreshClaims>(token, &self.refresh_keys.decoding, &validation)?;

        if token_data.claims.token_type != TokenType::Refresh {
            return Err(AuthError::InvalidToken(
                "Token is not a refresh token".to_string(),
            ));
        }

        token_data.claims.check_payload()?;

        Ok(token_data.claims)
    }

    /// Extract access claims without verifying signature or expiry. Only for
    /// paths that must read identity from a token that may already be stale,
    /// such as logout.
    pub fn decode_access_unverified(&self, token: &str) -> Result<AccessClaims> {
        let mut validation = Validation::new(self.algorithm);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;

        let token_data = decode::<AccessClaims>(token, &self.access_keys.decoding, &validation)?;
        Ok(token_data.claims)
    }

    /// True when the token's exp claim has passed or the token cannot be
    /// decoded at all. Does not verify the signature.
    pub fn is_token_expired(&self, token: &str) -> bool {
        match self.get_expiration(token) {
            Ok(exp) => exp <= Utc::now().timestamp(),
            Err(_) => true,
        }
    }

    /// Read the exp claim without verification. Works for both token kinds
    /// since refresh claims are a subset of access claims.
    pub fn get_expiration(&self, token: &str) -> Result<i64> {
        let mut validation = Validation::new(self.algorithm);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;

        let token_data = decode::<RefreshClaims>(token, &self.refresh_keys.decoding, &validation)?;
        Ok(token_data.claims.exp)
    }
}

/// Generate a SHA256 hash of a token (for storing in database)
pub fn hash_token(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Generate a random session identifier: 32 bytes from the OS RNG, hex
/// encoded to 64 characters.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Pull the token out of an Authorization header value. The header must be
/// exactly `Bearer <token>`; missing schemes, empty tokens and extra
/// whitespace are all rejected.
pub fn extract_bearer_token(header: &str) -> Result<&str> {
    let parts: Vec<&str> = header.split(' ').collect();

    if parts.len() != 2 || parts[0] != "Bearer" || parts[1].is_empty() {
        return Err(AuthError::InvalidToken(
            "Invalid authorization header".to_string(),
        ));
    }

    Ok(parts[1])
}
