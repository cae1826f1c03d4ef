//! services/client/src/app/auth.rs
//!
//! Account flows: login, registration, logout, and the small pieces of local
//! state that go with them (cached user, remembered credentials, onboarding).

use crate::app::state::AppState;
use crate::app::user_store::UserStore;
use pass_share_core::domain::{LoginCredentials, Registration, RememberedCredentials, User};
use pass_share_core::ports::{AccountApi, Notice, Notifier, PortError, PortResult};
use pass_share_core::validation::{
    registration_conflict, validate_login, validate_registration, FieldError,
};
use std::sync::Arc;
use tracing::{error, info};

//=========================================================================================
// Error Type
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// One or more form fields need fixing; nothing was sent.
    #[error("{}", .0.first().map(|e| e.message.as_str()).unwrap_or("Invalid input"))]
    Invalid(Vec<FieldError>),

    /// The server rejected a value that belongs to a specific field.
    #[error("{0}")]
    Conflict(FieldError),

    #[error("{}", .0.user_message())]
    Port(#[from] PortError),
}

//=========================================================================================
// AuthController
//=========================================================================================

#[derive(Clone)]
pub struct AuthController {
    account_api: Arc<dyn AccountApi>,
    notifier: Arc<dyn Notifier>,
    users: UserStore,
}

impl AuthController {
    pub fn new(app: &AppState) -> Self {
        Self {
            account_api: app.account_api.clone(),
            notifier: app.notifier.clone(),
            users: UserStore::new(app.store.clone()),
        }
    }

    pub fn user_store(&self) -> &UserStore {
        &self.users
    }

    /// Logs in and caches the returned identity.
    ///
    /// With `remember` set the credentials are stored for the next launch;
    /// otherwise any previously remembered ones are removed.
    pub async fn login(
        &self,
        credentials: LoginCredentials,
        remember: bool,
    ) -> Result<User, AuthError> {
        validate_login(&credentials).map_err(AuthError::Invalid)?;

        let user = match self.account_api.login(&credentials).await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "Login failed");
                self.notifier.notify(Notice::error(e.user_message()));
                return Err(e.into());
            }
        };

        self.users.save_user(&user).await?;
        if remember {
            self.users
                .save_credentials(&RememberedCredentials {
                    identifier: credentials.identifier,
                    password: credentials.password,
                })
                .await?;
        } else {
            self.users.clear_credentials().await?;
        }

        info!(username = %user.username, "Logged in");
        self.notifier
            .notify(Notice::success(format!("Logged in as {}", user.username)));
        Ok(user)
    }

    pub async fn register(&self, registration: Registration) -> Result<(), AuthError> {
        validate_registration(&registration).map_err(AuthError::Invalid)?;

        if let Err(e) = self.account_api.register(&registration).await {
            error!(error = %e, "Registration failed");
            let conflict = match &e {
                PortError::Rejected { status, message } => registration_conflict(*status, message),
                _ => None,
            };
            return Err(match conflict {
                Some(field_error) => {
                    self.notifier.notify(Notice::error(field_error.message.clone()));
                    AuthError::Conflict(field_error)
                }
                None => {
                    self.notifier.notify(Notice::error(e.user_message()));
                    AuthError::Port(e)
                }
            });
        }

        info!(username = %registration.username, "Registered");
        self.notifier.notify(Notice::success(
            "Registration successful. Please sign in to continue.",
        ));
        Ok(())
    }

    /// Drops the cached identity. Remembered credentials stay.
    pub async fn logout(&self) -> PortResult<()> {
        self.users.clear_user().await?;
        info!("Logged out");
        self.notifier.notify(Notice::success("Signed out"));
        Ok(())
    }

    pub async fn current_user(&self) -> PortResult<Option<User>> {
        self.users.load_user().await
    }

    pub async fn remembered_credentials(&self) -> PortResult<Option<RememberedCredentials>> {
        self.users.load_credentials().await
    }

    /// Completes a partly filled login form from the remembered credentials.
    ///
    /// A typed identifier only takes the remembered password when it names
    /// the same account. Fields that stay empty are left to validation.
    pub async fn prefill_login(
        &self,
        identifier: Option<String>,
        password: Option<String>,
    ) -> PortResult<LoginCredentials> {
        let remembered = match (&identifier, &password) {
            (Some(_), Some(_)) => None,
            _ => self.users.load_credentials().await?,
        };

        let (identifier, password) = match (identifier, password, remembered) {
            (None, None, Some(saved)) => (saved.identifier, saved.password),
            (Some(identifier), None, Some(saved)) if saved.identifier == identifier => {
                (identifier, saved.password)
            }
            (None, Some(password), Some(saved)) => (saved.identifier, password),
            (identifier, password, _) => {
                (identifier.unwrap_or_default(), password.unwrap_or_default())
            }
        };
        Ok(LoginCredentials {
            identifier,
            password,
        })
    }

    pub async fn has_onboarded(&self) -> PortResult<bool> {
        self.users.has_onboarded().await
    }

    pub async fn complete_onboarding(&self) -> PortResult<()> {
        self.users.mark_onboarded().await
    }
}
