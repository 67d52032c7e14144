//! Authentication, cookie transport and connection admission.

pub mod auth;
pub mod cookies;
pub mod gatekeeper;

pub use auth::{AuthError, AuthFailure, AuthService, IssuedTokens, LoginCredentials, TokenSources};
pub use cookies::{AuthCookie, CookieHelper};
pub use gatekeeper::{
    Admission, ConnectionIdentity, Gatekeeper, HandshakeError, HandshakeRequest, PresenceGuard,
};
