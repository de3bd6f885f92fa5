//! Authentication session.
//!
//! Holds the current [`Identity`] and keeps the backend token in local storage
//! under [`keys::AUTH_TOKEN`] so a restarted client comes back logged in.

use std::sync::Arc;

use ebasi_core::{Email, EmailError, UserId};
use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::api::types::{LoginResponse, Profile};
use crate::api::{ApiClient, ApiError};
use crate::error::add_breadcrumb;
use crate::storage::{LocalStorage, StorageError, keys};

/// Errors from login and logout.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// An authenticated user.
///
/// `Debug` never prints the token.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Email,
    pub display_name: String,
    token: SecretString,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: UserId, email: Email, token: SecretString) -> Self {
        let display_name = email.local_part().to_string();
        Self {
            user_id,
            email,
            display_name,
            token,
        }
    }

    fn from_profile(profile: Profile, token: SecretString) -> Self {
        let display_name = format!("{} {}", profile.first_name, profile.last_name)
            .trim()
            .to_string();
        let mut identity = Self::new(profile.id, profile.email, token);
        if !display_name.is_empty() {
            identity.display_name = display_name;
        }
        identity
    }

    /// The backend auth token.
    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.token
    }
}

/// Login state for one client.
#[derive(Debug)]
pub struct AuthSession {
    api: ApiClient,
    storage: Arc<dyn LocalStorage>,
    current: Option<Identity>,
}

impl AuthSession {
    /// A logged-out session.
    #[must_use]
    pub fn guest(api: ApiClient, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            api,
            storage,
            current: None,
        }
    }

    /// Resume a session from a stored token.
    ///
    /// Any failure (no token, unreadable storage, rejected token, backend
    /// down) yields a guest session. A token the backend rejects, or one whose
    /// profile cannot be fetched, is removed from storage.
    #[instrument(skip_all)]
    pub async fn restore(api: ApiClient, storage: Arc<dyn LocalStorage>) -> Self {
        let mut session = Self::guest(api, storage);

        let token = match session.storage.get_item(keys::AUTH_TOKEN) {
            Ok(Some(token)) if !token.is_empty() => SecretString::from(token),
            Ok(_) => return session,
            Err(e) => {
                warn!(error = %e, "Failed to read stored auth token");
                return session;
            }
        };

        match session.api.profile(&token).await {
            Ok(profile) => {
                let identity = Identity::from_profile(profile, token);
                info!(user_id = %identity.user_id, "Session restored");
                session.current = Some(identity);
            }
            Err(e) => {
                warn!(error = %e, "Stored auth token unusable, continuing as guest");
                add_breadcrumb("auth", "Discarded stored auth token", None);
                if let Err(e) = session.storage.remove_item(keys::AUTH_TOKEN) {
                    warn!(error = %e, "Failed to remove stale auth token");
                }
            }
        }
        session
    }

    /// The logged-in user, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Log in with email and password.
    ///
    /// The token is persisted before the profile is fetched. If the profile
    /// call fails, the identity is built from the login response instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is malformed, the backend rejects the
    /// credentials, or the token cannot be stored.
    #[instrument(skip(self, password))]
    pub async fn login(
        &mut self,
        email: &str,
        password: SecretString,
    ) -> Result<&Identity, SessionError> {
        let email = Email::parse(email)?;
        let LoginResponse {
            token,
            user_id,
            email: returned_email,
        } = self.api.login(&email, &password).await?;

        self.storage.set_item(keys::AUTH_TOKEN, &token)?;
        let token = SecretString::from(token);

        let identity = match self.api.profile(&token).await {
            Ok(profile) => Identity::from_profile(profile, token),
            Err(profile_error) => {
                warn!(error = %profile_error, "Profile fetch after login failed");
                let Some(user_id) = user_id else {
                    self.storage.remove_item(keys::AUTH_TOKEN)?;
                    return Err(profile_error.into());
                };
                Identity::new(user_id, returned_email.unwrap_or(email), token)
            }
        };

        info!(user_id = %identity.user_id, "Logged in");
        Ok(self.current.insert(identity))
    }

    /// Log out.
    ///
    /// The server-side logout is best effort; the local token is always
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the stored token cannot be removed.
    #[instrument(skip(self))]
    pub async fn logout(&mut self) -> Result<(), SessionError> {
        if let Some(identity) = self.current.take() {
            if let Err(e) = self.api.logout(identity.token()).await {
                warn!(error = %e, user_id = %identity.user_id, "Server logout failed");
            }
            info!(user_id = %identity.user_id, "Logged out");
        }
        self.storage.remove_item(keys::AUTH_TOKEN)?;
        Ok(())
    }
}
