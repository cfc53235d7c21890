//! Bearer token validation and issuance.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::schema::AuthConfig;

/// Identity of the caller, derived from a validated token or synthesized
/// when auth is disabled. Partition key for rate limiting and caching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub subject: String,
    pub scopes: Vec<String>,
}

impl ClientIdentity {
    pub const ANONYMOUS_SUBJECT: &'static str = "anonymous";

    /// Synthetic identity used when auth is disabled. Constant subject,
    /// so all unauthenticated traffic shares one partition.
    pub fn anonymous() -> Self {
        Self {
            subject: Self::ANONYMOUS_SUBJECT.to_string(),
            scopes: Vec::new(),
        }
    }
}

/// Claim set carried by gateway tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub iat: u64,
    pub exp: u64,
}

/// Per-request authentication failures. All surface as 401 with distinct
/// error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,

    #[error("token is not a well-formed signed credential")]
    Malformed,

    #[error("token signature verification failed")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,
}

impl AuthError {
    pub fn error_code(self) -> &'static str {
        match self {
            AuthError::Missing => "missing_token",
            AuthError::Malformed => "token_malformed",
            AuthError::InvalidSignature => "token_invalid_signature",
            AuthError::Expired => "token_expired",
        }
    }
}

/// Validates bearer tokens against the configured secret and expiry
/// policy, and mints tokens for the development CLI.
pub struct TokenValidator {
    enabled: bool,
    secret: String,
    token_ttl_minutes: u64,
}

impl TokenValidator {
    pub fn from_config(auth: &AuthConfig) -> Self {
        Self {
            enabled: auth.enabled,
            secret: auth.secret.clone(),
            token_ttl_minutes: auth.token_ttl_minutes,
        }
    }

    /// Validate a bearer token at the given unix time.
    ///
    /// When auth is disabled this returns the anonymous identity without
    /// inspecting the token at all.
    pub fn validate(&self, token: Option<&str>, now: u64) -> Result<ClientIdentity, AuthError> {
        if !self.enabled {
            return Ok(ClientIdentity::anonymous());
        }

        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthError::Missing),
        };

        // Reject non-HMAC algorithms before any signature work; an
        // unparseable header is just a malformed token.
        let header = decode_header(token).map_err(|_| AuthError::Malformed)?;
        if header.alg != Algorithm::HS256 {
            return Err(AuthError::Malformed);
        }

        // Expiry is checked below against the caller's clock, so decoding
        // itself must not consult the system time.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            _ => AuthError::Malformed,
        })?;

        if data.claims.exp <= now {
            return Err(AuthError::Expired);
        }

        Ok(ClientIdentity {
            subject: data.claims.sub,
            scopes: data.claims.scopes,
        })
    }

    /// Mint a signed token whose expiry is `now + token_ttl_minutes`.
    pub fn issue(
        &self,
        subject: &str,
        scopes: &[String],
        now: u64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: subject.to_string(),
            scopes: scopes.to_vec(),
            iat: now,
            exp: now + self.token_ttl_minutes * 60,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }
}
