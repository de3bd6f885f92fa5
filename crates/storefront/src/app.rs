//! The storefront state container.
//!
//! [`Storefront`] owns local storage, the API client, the auth session and
//! both state stores. The host constructs one explicitly and passes it where
//! it is needed; nothing here is a global.
//!
//! Identity changes flow one way: [`Storefront::login`] and
//! [`Storefront::logout`] update the session and then reload the wishlist for
//! the new identity. The cart never reacts to identity changes.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, instrument, warn};

use crate::api::ApiClient;
use crate::cart::CartStore;
use crate::config::StorefrontConfig;
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::session::{AuthSession, Identity};
use crate::storage::{FileStorage, LocalStorage};
use crate::wishlist::WishlistStore;

/// Client-side storefront state.
#[derive(Debug)]
pub struct Storefront {
    storage: Arc<dyn LocalStorage>,
    api: ApiClient,
    session: AuthSession,
    cart: CartStore,
    wishlist: WishlistStore<ApiClient>,
}

impl Storefront {
    /// Open the storefront from configuration, using file storage under
    /// `config.storage_dir`.
    ///
    /// # Errors
    ///
    /// See [`Storefront::with_parts`]; also fails if the HTTP client cannot
    /// be built.
    pub async fn open(config: &StorefrontConfig) -> Result<Self> {
        let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::new(&config.storage_dir));
        let api = ApiClient::new(&config.api)?;
        Self::with_parts(storage, api).await
    }

    /// Assemble the storefront from existing parts.
    ///
    /// Restores the session from a stored token, loads the cart, and loads
    /// the wishlist for the restored identity. A wishlist load failure is
    /// logged and leaves an empty, ready wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart snapshot cannot be read.
    #[instrument(skip_all)]
    pub async fn with_parts(storage: Arc<dyn LocalStorage>, api: ApiClient) -> Result<Self> {
        let session = AuthSession::restore(api.clone(), Arc::clone(&storage)).await;
        let cart = CartStore::open(Arc::clone(&storage))?;
        let wishlist = WishlistStore::new(api.clone(), Arc::clone(&storage));

        if let Some(identity) = session.current() {
            set_sentry_user(&identity.user_id, Some(identity.email.as_str()));
        }
        if let Err(e) = wishlist.set_identity(session.current().cloned()).await {
            warn!(error = %e, "Initial wishlist load failed");
        }

        info!(
            authenticated = session.is_authenticated(),
            cart_lines = cart.len(),
            wishlist_items = wishlist.len(),
            "Storefront ready"
        );

        Ok(Self {
            storage,
            api,
            session,
            cart,
            wishlist,
        })
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut CartStore {
        &mut self.cart
    }

    #[must_use]
    pub const fn wishlist(&self) -> &WishlistStore<ApiClient> {
        &self.wishlist
    }

    #[must_use]
    pub const fn session(&self) -> &AuthSession {
        &self.session
    }

    /// The logged-in user, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.session.current()
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn LocalStorage> {
        &self.storage
    }

    /// Log in and switch the wishlist to the account's server list.
    ///
    /// Guest wishlist entries are not merged into the account. They stay in
    /// local storage and come back after logout.
    ///
    /// # Errors
    ///
    /// Returns an error if the login itself fails. A failed wishlist load
    /// after a successful login is logged, not returned.
    #[instrument(skip(self, password))]
    pub async fn login(&mut self, email: &str, password: SecretString) -> Result<Identity> {
        let identity = self.session.login(email, password).await?.clone();
        set_sentry_user(&identity.user_id, Some(identity.email.as_str()));
        add_breadcrumb("auth", "Logged in", None);

        if let Err(e) = self.wishlist.set_identity(Some(identity.clone())).await {
            warn!(error = %e, user_id = %identity.user_id, "Wishlist load after login failed");
        }
        Ok(identity)
    }

    /// Log out and switch the wishlist back to the guest list.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored token cannot be removed.
    #[instrument(skip(self))]
    pub async fn logout(&mut self) -> Result<()> {
        self.session.logout().await?;
        clear_sentry_user();
        add_breadcrumb("auth", "Logged out", None);

        if let Err(e) = self.wishlist.set_identity(None).await {
            warn!(error = %e, "Guest wishlist load after logout failed");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ebasi_core::{Price, Product, ProductId};
    use url::Url;

    use super::*;
    use crate::config::ApiConfig;
    use crate::storage::{MemoryStorage, keys};
    use crate::wishlist::LoadState;

    fn offline_api() -> ApiClient {
        // Nothing listens on the discard port; every call fails fast.
        ApiClient::new(&ApiConfig {
            base_url: Url::parse("http://127.0.0.1:9/api/v1/").unwrap(),
            timeout: None,
        })
        .unwrap()
    }

    fn saree() -> Product {
        Product::new(ProductId::new(7), "Saree A", Price::from_units(2499))
    }

    #[tokio::test]
    async fn test_guest_start_with_empty_storage() {
        let storefront = Storefront::with_parts(Arc::new(MemoryStorage::new()), offline_api())
            .await
            .unwrap();

        assert!(storefront.identity().is_none());
        assert!(storefront.cart().is_empty());
        assert_eq!(storefront.wishlist().state(), LoadState::Ready);
    }

    #[tokio::test]
    async fn test_unusable_token_is_dropped_on_start() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(keys::AUTH_TOKEN, "stale").unwrap();

        let storefront = Storefront::with_parts(storage.clone(), offline_api())
            .await
            .unwrap();
        assert!(storefront.identity().is_none());
        assert_eq!(storage.get_item(keys::AUTH_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn test_guest_state_survives_restart() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let mut storefront = Storefront::with_parts(storage.clone(), offline_api())
                .await
                .unwrap();
            storefront.cart_mut().add_to_cart(&saree(), 2).unwrap();
            storefront.wishlist().add_to_wishlist(&saree()).await.unwrap();
        }

        let storefront = Storefront::with_parts(storage, offline_api())
            .await
            .unwrap();
        assert_eq!(storefront.cart().item_count(), 2);
        assert!(storefront.wishlist().is_in_wishlist(ProductId::new(7)));
    }

    #[tokio::test]
    async fn test_failed_login_keeps_guest_state() {
        let mut storefront = Storefront::with_parts(Arc::new(MemoryStorage::new()), offline_api())
            .await
            .unwrap();
        storefront.wishlist().add_to_wishlist(&saree()).await.unwrap();

        let err = storefront
            .login("shopper@ebasi.store", SecretString::from("pw".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::StorefrontError::Session(_)));
        assert!(storefront.identity().is_none());
        assert!(storefront.wishlist().is_in_wishlist(ProductId::new(7)));
    }

    #[tokio::test]
    async fn test_logout_as_guest_is_harmless() {
        let mut storefront = Storefront::with_parts(Arc::new(MemoryStorage::new()), offline_api())
            .await
            .unwrap();
        storefront.logout().await.unwrap();
        assert_eq!(storefront.wishlist().state(), LoadState::Ready);
    }
}
