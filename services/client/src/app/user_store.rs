//! services/client/src/app/user_store.rs
//!
//! Typed access to the locally persisted identity, remembered credentials and
//! onboarding flag.

use pass_share_core::domain::{RememberedCredentials, User};
use pass_share_core::ports::{KeyValueStore, PortError, PortResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

pub const USER_KEY: &str = "user";
pub const REMEMBERED_CREDENTIALS_KEY: &str = "rememberedCredentials";
pub const HAS_ONBOARDED_KEY: &str = "hasOnboarded";

//=========================================================================================
// "Impure" Storage Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    id: String,
    username: String,
    #[serde(default)]
    is_admin: bool,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            is_admin: self.is_admin,
        }
    }

    fn from_domain(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}

// The login form's single identifier field has always been stored as `email`.
#[derive(Serialize, Deserialize)]
struct CredentialsRecord {
    email: String,
    password: String,
}

//=========================================================================================
// UserStore
//=========================================================================================

#[derive(Clone)]
pub struct UserStore {
    store: Arc<dyn KeyValueStore>,
}

impl UserStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load_user(&self) -> PortResult<Option<User>> {
        Ok(self
            .read_json::<UserRecord>(USER_KEY)
            .await?
            .map(UserRecord::to_domain))
    }

    pub async fn save_user(&self, user: &User) -> PortResult<()> {
        self.write_json(USER_KEY, &UserRecord::from_domain(user)).await
    }

    pub async fn clear_user(&self) -> PortResult<()> {
        self.store.remove(USER_KEY).await
    }

    pub async fn load_credentials(&self) -> PortResult<Option<RememberedCredentials>> {
        Ok(self
            .read_json::<CredentialsRecord>(REMEMBERED_CREDENTIALS_KEY)
            .await?
            .map(|record| RememberedCredentials {
                identifier: record.email,
                password: record.password,
            }))
    }

    pub async fn save_credentials(&self, credentials: &RememberedCredentials) -> PortResult<()> {
        let record = CredentialsRecord {
            email: credentials.identifier.clone(),
            password: credentials.password.clone(),
        };
        self.write_json(REMEMBERED_CREDENTIALS_KEY, &record).await
    }

    pub async fn clear_credentials(&self) -> PortResult<()> {
        self.store.remove(REMEMBERED_CREDENTIALS_KEY).await
    }

    pub async fn has_onboarded(&self) -> PortResult<bool> {
        Ok(self.store.get(HAS_ONBOARDED_KEY).await?.is_some())
    }

    pub async fn mark_onboarded(&self) -> PortResult<()> {
        self.store.set(HAS_ONBOARDED_KEY, "true").await
    }

    /// Reads a JSON value; an undecodable value counts as absent.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> PortResult<Option<T>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, "Ignoring unreadable stored value: {}", e);
                Ok(None)
            }
        }
    }

    async fn write_json<T: Serialize>(&self, key: &str, value: &T) -> PortResult<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| PortError::Storage(format!("Could not encode {}: {}", key, e)))?;
        self.store.set(key, &raw).await
    }
}
