//! JWT token codec with independent access and refresh signing contexts.
//!
//! Both contexts sign with HS256 but hold their own secret, so a token
//! minted for one context never verifies in the other.

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The only algorithm either context accepts.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Error type for token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,

    #[error("Token has expired")]
    Expired,

    #[error("Failed to encode token: {0}")]
    Encoding(String),

    #[error("Invalid signing secret: {0}")]
    InvalidSecret(String),
}

/// Which signing context a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Claims carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Session record identifier
    pub jti: String,
    /// Secondary random key of the session record
    pub session_key: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// Bound device, present only for desktop sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<Uuid>,
}

impl Claims {
    /// Builds claims for a session lineage node expiring at `expires_at`.
    pub fn new(
        user_id: Uuid,
        jti: impl Into<String>,
        session_key: impl Into<String>,
        expires_at: DateTime<Utc>,
        device_id: Option<Uuid>,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            jti: jti.into(),
            session_key: session_key.into(),
            exp: expires_at.timestamp(),
            iat: Utc::now().timestamp(),
            device_id,
        }
    }

    /// Parses the subject claim as a user ID.
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Invalid)
    }
}

#[derive(Clone)]
struct SigningContext {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningContext {
    fn from_secret(kind: TokenKind, secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::InvalidSecret(format!(
                "{} secret must not be empty",
                kind.as_str()
            )));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }
}

/// Stateless encoder/decoder for access and refresh tokens.
#[derive(Clone)]
pub struct TokenCodec {
    access: SigningContext,
    refresh: SigningContext,
    leeway_secs: u64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &SIGNING_ALGORITHM)
            .field("leeway_secs", &self.leeway_secs)
            .field("access", &"[REDACTED]")
            .field("refresh", &"[REDACTED]")
            .finish()
    }
}

impl TokenCodec {
    /// Creates a codec from the two context secrets.
    ///
    /// Identical secrets are rejected: they would make access and refresh
    /// tokens interchangeable.
    pub fn new(access_secret: &str, refresh_secret: &str, leeway_secs: u64) -> Result<Self, TokenError> {
        if access_secret == refresh_secret {
            return Err(TokenError::InvalidSecret(
                "access and refresh secrets must differ".to_string(),
            ));
        }
        Ok(Self {
            access: SigningContext::from_secret(TokenKind::Access, access_secret)?,
            refresh: SigningContext::from_secret(TokenKind::Refresh, refresh_secret)?,
            leeway_secs,
        })
    }

    fn context(&self, kind: TokenKind) -> &SigningContext {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Signs the claims in the given context.
    pub fn encode(&self, kind: TokenKind, claims: &Claims) -> Result<String, TokenError> {
        encode(
            &Header::new(SIGNING_ALGORITHM),
            claims,
            &self.context(kind).encoding_key,
        )
        .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verifies signature and expiry in the given context.
    pub fn decode(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        decode::<Claims>(token, &self.context(kind).decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    pub fn encode_access(&self, claims: &Claims) -> Result<String, TokenError> {
        self.encode(TokenKind::Access, claims)
    }

    pub fn decode_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode(TokenKind::Access, token)
    }

    pub fn encode_refresh(&self, claims: &Claims) -> Result<String, TokenError> {
        self.encode(TokenKind::Refresh, claims)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode(TokenKind::Refresh, token)
    }
}

/// Strips an optional `Bearer ` scheme and surrounding whitespace.
///
/// Returns `None` for blank input so that empty transports count as absent.
pub fn strip_bearer(raw: &str) -> Option<&str> {
    let token = raw.split_whitespace().last()?;
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
