pub mod gate;
pub mod password;

use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::SecurityConfig;

pub use gate::{authorize, Capability, Requirement};

/// Authenticated caller as decoded from a bearer token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub id: i64,
    pub is_admin: bool,
    pub is_supplier: bool,
    pub is_customer: bool,
}

/// Signed claims. Role flags are frozen at issuance until `exp`.
#[derive(Debug, Serialize)]
pub struct Claims {
    pub sub: String,
    pub id: i64,
    pub is_admin: bool,
    pub is_supplier: bool,
    pub is_customer: bool,
    pub exp: i64,
}

impl Claims {
    pub fn new(identity: &Identity, exp: i64) -> Self {
        Self {
            sub: identity.username.clone(),
            id: identity.id,
            is_admin: identity.is_admin,
            is_supplier: identity.is_supplier,
            is_customer: identity.is_customer,
            exp,
        }
    }
}

// Every field optional so missing or mistyped claims are reported by us,
// not swallowed as a generic decode failure.
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: Option<String>,
    id: Option<i64>,
    is_admin: Option<bool>,
    is_supplier: Option<bool>,
    is_customer: Option<bool>,
    exp: Option<Value>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Could not validate user")]
    Unauthenticated,

    #[error("Token expired!")]
    Expired,

    #[error("Permission denied")]
    Forbidden,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Token lifetime must be a positive number of minutes, got {0}")]
    InvalidTtl(i64),
}

/// Issues and validates bearer tokens against a shared HMAC secret
#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, algorithm: &str, ttl: Duration) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }
        if ttl <= Duration::zero() {
            return Err(JwtError::InvalidTtl(ttl.num_minutes()));
        }

        let algorithm = Algorithm::from_str(algorithm.trim())
            .map_err(|_| JwtError::UnsupportedAlgorithm(algorithm.to_string()))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(JwtError::UnsupportedAlgorithm(format!("{:?}", algorithm)));
        }

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, JwtError> {
        let minutes = security.token_ttl_minutes;
        let ttl = Duration::try_minutes(minutes).ok_or(JwtError::InvalidTtl(minutes))?;
        Self::new(&security.jwt_secret, &security.jwt_algorithm, ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token valid for the configured ttl
    pub fn issue(&self, identity: &Identity) -> Result<String, JwtError> {
        self.issue_with_ttl(identity, self.ttl)
    }

    pub fn issue_with_ttl(&self, identity: &Identity, ttl: Duration) -> Result<String, JwtError> {
        self.issue_at(identity, ttl, Utc::now().timestamp())
    }

    pub fn issue_at(&self, identity: &Identity, ttl: Duration, now: i64) -> Result<String, JwtError> {
        let claims = Claims::new(identity, now + ttl.num_seconds());
        self.sign(&claims)
    }

    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Verify the signature and claims of `token` as of `now` (seconds since epoch)
    pub fn validate_at(&self, token: &str, now: i64) -> Result<Identity, AuthError> {
        // Expiry is checked below without leeway
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.set_required_spec_claims::<&str>(&[]);

        let data = decode::<RawClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            AuthError::Unauthenticated
        })?;
        let claims = data.claims;

        let (username, id) = match (claims.sub, claims.id) {
            (Some(sub), Some(id)) => (sub, id),
            _ => return Err(AuthError::Unauthenticated),
        };

        let exp = claims
            .exp
            .as_ref()
            .and_then(Value::as_i64)
            .ok_or(AuthError::Unauthenticated)?;

        if now >= exp {
            return Err(AuthError::Expired);
        }

        Ok(Identity {
            username,
            id,
            is_admin: claims.is_admin.unwrap_or(false),
            is_supplier: claims.is_supplier.unwrap_or(false),
            is_customer: claims.is_customer.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> TokenService {
        TokenService::new("test-secret", "HS256", Duration::minutes(20)).unwrap()
    }

    fn supplier() -> Identity {
        Identity {
            username: "sam".to_string(),
            id: 7,
            is_admin: false,
            is_supplier: true,
            is_customer: true,
        }
    }

    fn security(ttl_minutes: i64) -> SecurityConfig {
        let mut security = crate::config::AppConfig::development().security;
        security.token_ttl_minutes = ttl_minutes;
        security
    }

    #[test]
    fn configured_ttl_must_be_positive_and_in_range() {
        assert_eq!(TokenService::from_config(&security(20)).unwrap().ttl(), Duration::minutes(20));
        assert!(matches!(TokenService::from_config(&security(0)), Err(JwtError::InvalidTtl(0))));
        assert!(matches!(TokenService::from_config(&security(-5)), Err(JwtError::InvalidTtl(-5))));
        assert!(matches!(
            TokenService::from_config(&security(i64::MAX)),
            Err(JwtError::InvalidTtl(i64::MAX))
        ));
    }

    #[test]
    fn issued_token_validates_until_ttl_elapses() {
        let tokens = service();
        let now = 1_700_000_000;
        let token = tokens.issue_at(&supplier(), Duration::seconds(60), now).unwrap();

        assert_eq!(tokens.validate_at(&token, now).unwrap(), supplier());
        assert_eq!(tokens.validate_at(&token, now + 59).unwrap(), supplier());
        assert_eq!(tokens.validate_at(&token, now + 60), Err(AuthError::Expired));
        assert_eq!(tokens.validate_at(&token, now + 3600), Err(AuthError::Expired));
    }

    #[test]
    fn token_with_default_ttl_validates_now() {
        let tokens = service();
        let token = tokens.issue(&supplier()).unwrap();
        assert_eq!(tokens.validate(&token).unwrap().id, 7);
    }

    #[test]
    fn already_expired_token_is_rejected() {
        let tokens = service();
        let token = tokens.issue_with_ttl(&supplier(), Duration::seconds(-5)).unwrap();
        assert_eq!(tokens.validate(&token), Err(AuthError::Expired));
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let token = service().issue(&supplier()).unwrap();
        let other = TokenService::new("other-secret", "HS256", Duration::minutes(20)).unwrap();
        assert_eq!(other.validate(&token), Err(AuthError::Unauthenticated));
    }

    #[test]
    fn garbage_is_unauthenticated() {
        assert_eq!(service().validate("not-a-jwt"), Err(AuthError::Unauthenticated));
    }

    #[test]
    fn missing_subject_or_id_is_unauthenticated() {
        let tokens = service();
        let exp = Utc::now().timestamp() + 600;

        let no_sub = tokens.sign(&json!({ "id": 1, "exp": exp })).unwrap();
        assert_eq!(tokens.validate(&no_sub), Err(AuthError::Unauthenticated));

        let no_id = tokens.sign(&json!({ "sub": "sam", "exp": exp })).unwrap();
        assert_eq!(tokens.validate(&no_id), Err(AuthError::Unauthenticated));
    }

    #[test]
    fn missing_or_non_integer_expiry_is_unauthenticated() {
        let tokens = service();

        let no_exp = tokens.sign(&json!({ "sub": "sam", "id": 1 })).unwrap();
        assert_eq!(tokens.validate(&no_exp), Err(AuthError::Unauthenticated));

        let float_exp = tokens
            .sign(&json!({ "sub": "sam", "id": 1, "exp": 9_999_999_999.5 }))
            .unwrap();
        assert_eq!(tokens.validate(&float_exp), Err(AuthError::Unauthenticated));

        let string_exp = tokens
            .sign(&json!({ "sub": "sam", "id": 1, "exp": "tomorrow" }))
            .unwrap();
        assert_eq!(tokens.validate(&string_exp), Err(AuthError::Unauthenticated));
    }

    #[test]
    fn absent_role_flags_decode_as_false() {
        let tokens = service();
        let exp = Utc::now().timestamp() + 600;
        let token = tokens.sign(&json!({ "sub": "sam", "id": 3, "exp": exp })).unwrap();

        let identity = tokens.validate(&token).unwrap();
        assert!(!identity.is_admin);
        assert!(!identity.is_supplier);
        assert!(!identity.is_customer);
    }

    #[test]
    fn rejects_empty_secret_and_asymmetric_algorithms() {
        assert!(matches!(
            TokenService::new("", "HS256", Duration::minutes(1)),
            Err(JwtError::InvalidSecret)
        ));
        assert!(matches!(
            TokenService::new("s", "RS256", Duration::minutes(1)),
            Err(JwtError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            TokenService::new("s", "nope", Duration::minutes(1)),
            Err(JwtError::UnsupportedAlgorithm(_))
        ));
        assert!(TokenService::new("s", "HS512", Duration::minutes(1)).is_ok());
    }
}
