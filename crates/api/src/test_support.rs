//! Fixtures shared by unit tests.

use std::sync::Arc;

use chrono::Utc;
use domain::models::{
    Capabilities, ClientRole, Device, NewDeviceShare, NewPermissionGroup, PermissionGroup,
    ShareStatus, User,
};
use domain::services::{InMemoryStore, Stores};
use uuid::Uuid;

use crate::config::{JwtAuthConfig, RelayConfig};
use crate::services::{AuthService, Gatekeeper, IssuedTokens, LoginCredentials};

pub const PASSWORD: &str = "fixture-password";

pub struct TestUser {
    pub user: User,
    pub access_token: String,
}

pub struct Fixture {
    pub backend: Arc<InMemoryStore>,
    pub stores: Stores,
    pub auth: AuthService,
    pub gatekeeper: Gatekeeper,
}

pub fn jwt_config() -> JwtAuthConfig {
    JwtAuthConfig {
        access_secret: "fixture-access-secret".to_string(),
        refresh_secret: "fixture-refresh-secret".to_string(),
        access_token_expiry_secs: 900,
        refresh_token_expiry_secs: 3600,
        leeway_secs: 0,
    }
}

pub fn relay_config() -> RelayConfig {
    RelayConfig {
        presence_retry_delay_ms: 1,
        subscriber_buffer: 16,
        ..RelayConfig::default()
    }
}

impl Fixture {
    pub fn new() -> Self {
        let backend = Arc::new(InMemoryStore::new());
        let stores = Stores::from_backend(backend.clone());
        let auth = AuthService::new(stores.clone(), &jwt_config()).unwrap();
        let gatekeeper = Gatekeeper::new(auth.clone(), &relay_config());
        Self {
            backend,
            stores,
            auth,
            gatekeeper,
        }
    }

    /// Registers `username` and returns its web access token.
    pub async fn user(&self, username: &str) -> TestUser {
        let (user, tokens) = self
            .auth
            .register(username, &format!("{}@example.com", username), PASSWORD)
            .await
            .unwrap();
        TestUser {
            user,
            access_token: tokens.access_token,
        }
    }

    /// Desktop login that auto-creates a device named `device_name`.
    pub async fn desktop_login(&self, owner: &TestUser, device_name: &str) -> IssuedTokens {
        self.auth
            .login(LoginCredentials {
                email: owner.user.email.clone(),
                password: PASSWORD.to_string(),
                role: ClientRole::Desktop,
                device_id: None,
                device_name: Some(device_name.to_string()),
            })
            .await
            .unwrap()
    }

    pub async fn device(&self, id: Uuid) -> Device {
        self.stores.devices.find_device(id).await.unwrap().unwrap()
    }

    /// Shares `device_id` with `recipient` under a fresh group owned by `owner`.
    pub async fn share(
        &self,
        owner: &TestUser,
        recipient: &TestUser,
        device_id: Uuid,
        capabilities: Capabilities,
    ) -> PermissionGroup {
        let group = self
            .stores
            .shares
            .create_permission_group(NewPermissionGroup {
                user_id: owner.user.id,
                name: Some("guests".to_string()),
                capabilities,
            })
            .await
            .unwrap();
        self.stores
            .shares
            .create_share(NewDeviceShare {
                device_id,
                user_id: recipient.user.id,
                permission_group_id: group.id,
                status: ShareStatus::Active,
                expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
            })
            .await
            .unwrap();
        group
    }
}
