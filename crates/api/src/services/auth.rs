//! Authentication service: request authorization, login, registration and
//! refresh-token rotation.

use chrono::{Duration, Utc};
use domain::models::{ClientRole, NewDevice, NewSession, NewUser, Session, User, UserRole};
use domain::services::Stores;
use domain::StoreError;
use shared::jwt::{strip_bearer, Claims, TokenCodec, TokenError};
use shared::password::{check_strength, hash_password, verify_decoy, verify_password, PasswordError};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::JwtAuthConfig;

/// Why a request or connection failed authorization.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("No token provided")]
    MissingToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session has expired")]
    SessionExpired,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthFailure {
    /// Machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "missing_token",
            AuthFailure::TokenExpired => "token_expired",
            AuthFailure::TokenInvalid => "token_invalid",
            AuthFailure::SessionNotFound => "session_not_found",
            AuthFailure::SessionExpired => "session_expired",
            AuthFailure::Store(_) => "store_unavailable",
        }
    }
}

/// Candidate token transports, in precedence order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSources<'a> {
    /// `Authorization` header or explicit body field.
    pub header: Option<&'a str>,
    /// Access token cookie.
    pub cookie: Option<&'a str>,
    /// Query or body parameter.
    pub param: Option<&'a str>,
}

impl<'a> TokenSources<'a> {
    /// First present, non-blank token. A `Bearer ` prefix is stripped.
    pub fn token(&self) -> Option<&'a str> {
        [self.header, self.cookie, self.param]
            .into_iter()
            .flatten()
            .find_map(strip_bearer)
    }
}

/// Errors from login, registration, refresh and logout.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session has expired")]
    SessionExpired,

    #[error("Session has been revoked")]
    SessionRevoked,

    #[error("Device does not match session")]
    DeviceMismatch,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Password error: {0}")]
    Password(PasswordError),

    #[error("Token encoding error: {0}")]
    Encoding(String),
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort => AuthError::WeakPassword(err.to_string()),
            other => AuthError::Password(other),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Invalid => AuthError::TokenInvalid,
            TokenError::Encoding(msg) | TokenError::InvalidSecret(msg) => AuthError::Encoding(msg),
        }
    }
}

/// Login input.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    pub role: ClientRole,
    /// Desktop only: reuse an existing device.
    pub device_id: Option<Uuid>,
    /// Desktop only: name for an auto-created device.
    pub device_name: Option<String>,
}

/// A freshly minted token pair and the session behind it.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub session: Session,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_in: i64,
}

impl IssuedTokens {
    pub fn user_id(&self) -> Uuid {
        self.session.user_id
    }

    pub fn device_id(&self) -> Option<Uuid> {
        self.session.device_id
    }
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    stores: Stores,
    codec: TokenCodec,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("codec", &self.codec)
            .field("access_lifetime", &self.access_lifetime)
            .field("refresh_lifetime", &self.refresh_lifetime)
            .finish()
    }
}

impl AuthService {
    pub fn new(stores: Stores, config: &JwtAuthConfig) -> Result<Self, TokenError> {
        let codec = TokenCodec::new(&config.access_secret, &config.refresh_secret, config.leeway_secs)?;
        Ok(Self {
            stores,
            codec,
            access_lifetime: Duration::seconds(config.access_token_expiry_secs),
            refresh_lifetime: Duration::seconds(config.refresh_token_expiry_secs),
        })
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Resolves the first present token to an active, unexpired session.
    ///
    /// The only authorization decision in the service: HTTP extractors and
    /// the websocket handshake both go through here.
    pub async fn authorize(&self, sources: &TokenSources<'_>) -> Result<Session, AuthFailure> {
        let token = sources.token().ok_or(AuthFailure::MissingToken)?;
        self.authorize_token(token).await
    }

    pub async fn authorize_token(&self, token: &str) -> Result<Session, AuthFailure> {
        let claims = self.codec.decode_access(token).map_err(|e| match e {
            TokenError::Expired => AuthFailure::TokenExpired,
            _ => AuthFailure::TokenInvalid,
        })?;
        let user_id = claims.user_id().map_err(|_| AuthFailure::TokenInvalid)?;

        let session = self
            .stores
            .sessions
            .find_session(
                user_id,
                &claims.jti,
                &claims.session_key,
                Some(domain::models::SessionStatus::Active),
            )
            .await?
            .ok_or(AuthFailure::SessionNotFound)?;

        if session.is_expired_at(Utc::now()) {
            return Err(AuthFailure::SessionExpired);
        }

        Ok(session)
    }

    /// Verifies credentials and opens a session for the requested role.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<IssuedTokens, AuthError> {
        let user = self.check_credentials(&credentials.email, &credentials.password).await?;

        let new_session = match credentials.role {
            ClientRole::Web => NewSession::web(user.id, self.refresh_lifetime),
            ClientRole::Desktop => {
                let device_id = self
                    .resolve_login_device(&user, credentials.device_id, credentials.device_name)
                    .await?;
                NewSession::desktop(user.id, device_id, self.refresh_lifetime)
            }
        };

        let session = self.stores.sessions.create_session(new_session).await?;
        info!(
            user_id = %user.id,
            role = %session.role,
            device_id = ?session.device_id,
            "User logged in"
        );
        self.issue(session)
    }

    /// Creates a `client` account and a web session for it.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, IssuedTokens), AuthError> {
        check_strength(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .stores
            .users
            .create_user(NewUser {
                username: username.trim().to_string(),
                email: email.trim().to_string(),
                password_hash,
                role: UserRole::Client,
            })
            .await?;

        let session = self
            .stores
            .sessions
            .create_session(NewSession::web(user.id, self.refresh_lifetime))
            .await?;
        info!(user_id = %user.id, "User registered");

        let tokens = self.issue(session)?;
        Ok((user, tokens))
    }

    /// Exchanges a refresh token for a new pair, revoking its session.
    ///
    /// Presenting the token of an already revoked session revokes every
    /// session of the user.
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedTokens, AuthError> {
        let token = strip_bearer(refresh_token).ok_or(AuthError::TokenInvalid)?;
        let claims = self.codec.decode_refresh(token)?;
        let user_id = claims.user_id()?;

        let session = self
            .stores
            .sessions
            .find_session(user_id, &claims.jti, &claims.session_key, None)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.is_revoked() {
            let revoked = self.stores.sessions.revoke_all_sessions(user_id).await?;
            warn!(
                user_id = %user_id,
                session_id = %session.id,
                revoked,
                "Refresh token reuse detected, all sessions revoked"
            );
            return Err(AuthError::SessionRevoked);
        }

        if let Some(claimed) = claims.device_id {
            if session.device_id != Some(claimed) {
                warn!(
                    user_id = %user_id,
                    session_id = %session.id,
                    claimed_device = %claimed,
                    "Refresh token device claim does not match session"
                );
                return Err(AuthError::DeviceMismatch);
            }
        }

        if session.is_expired_at(Utc::now()) {
            return Err(AuthError::SessionExpired);
        }

        let successor = NewSession::successor(&session, self.refresh_lifetime);
        let Some(next) = self.stores.sessions.rotate_session(session.id, successor).await? else {
            // Lost a concurrent rotation of the same session.
            let revoked = self.stores.sessions.revoke_all_sessions(user_id).await?;
            warn!(
                user_id = %user_id,
                session_id = %session.id,
                revoked,
                "Concurrent refresh of one session, all sessions revoked"
            );
            return Err(AuthError::SessionRevoked);
        };

        debug!(user_id = %user_id, previous = %session.id, next = %next.id, "Session rotated");
        self.issue(next)
    }

    /// Revokes the caller's session, or every session of the user.
    pub async fn logout(&self, session: &Session, all: bool) -> Result<u64, AuthError> {
        let revoked = if all {
            self.stores.sessions.revoke_all_sessions(session.user_id).await?
        } else {
            u64::from(self.stores.sessions.revoke_session(session.id).await?)
        };
        info!(user_id = %session.user_id, all, revoked, "User logged out");
        Ok(revoked)
    }

    async fn check_credentials(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Some(user) = self.stores.users.find_user_by_email(email.trim()).await? else {
            verify_decoy(password);
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    async fn resolve_login_device(
        &self,
        user: &User,
        device_id: Option<Uuid>,
        device_name: Option<String>,
    ) -> Result<Uuid, AuthError> {
        if let Some(device_id) = device_id {
            return match self.stores.devices.find_device(device_id).await? {
                Some(device) if device.is_owned_by(user.id) => Ok(device.id),
                _ => Err(AuthError::AccessDenied(
                    "Device does not belong to user".to_string(),
                )),
            };
        }

        let name = device_name
            .ok_or_else(|| AuthError::Validation("device_name is required".to_string()))?;
        let device = self
            .stores
            .devices
            .create_device(NewDevice::new(user.id, name.trim()))
            .await
            .map_err(|e| match e {
                StoreError::Validation(msg) => AuthError::Validation(msg),
                other => AuthError::Store(other),
            })?;
        info!(user_id = %user.id, device_id = %device.id, "Device created at login");
        Ok(device.id)
    }

    fn issue(&self, session: Session) -> Result<IssuedTokens, AuthError> {
        let device_id = match session.role {
            ClientRole::Desktop => session.device_id,
            ClientRole::Web => None,
        };

        let access_claims = Claims::new(
            session.user_id,
            session.jti.as_str(),
            session.session_key.as_str(),
            Utc::now() + self.access_lifetime,
            device_id,
        );
        let refresh_claims = Claims::new(
            session.user_id,
            session.jti.as_str(),
            session.session_key.as_str(),
            session.expires_at,
            device_id,
        );

        Ok(IssuedTokens {
            access_token: self.codec.encode_access(&access_claims)?,
            refresh_token: self.codec.encode_refresh(&refresh_claims)?,
            access_expires_in: self.access_lifetime.num_seconds(),
            session,
        })
    }
}
