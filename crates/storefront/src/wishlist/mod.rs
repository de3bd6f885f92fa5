//! Wishlist store.
//!
//! Two modes, chosen by the current identity:
//!
//! - **Guest**: the in-memory list is the authority and is mirrored to
//!   [`keys::WISHLIST`] after every mutation. No network.
//! - **Authenticated**: a read-through cache of the server list. A mutation is
//!   applied locally first, then one toggle call is sent, then the full list
//!   is refetched. A failed toggle rolls the local change back and is returned
//!   to the caller.
//!
//! Switching identity discards the in-memory list and reloads from the new
//! source. Guest entries are not carried over to the account; they stay in
//! local storage and reappear on logout.
//!
//! # Late results
//!
//! Every identity change bumps an epoch and every local change or refetch
//! bumps a revision. A load or refetch is applied only if neither moved while
//! it was in flight, so a slow response never overwrites newer state.

mod item;

pub use item::{LoadState, WishlistChange, WishlistItem, WishlistItemId};

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ebasi_core::{Product, ProductId};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::api::ApiError;
use crate::error::add_breadcrumb;
use crate::session::Identity;
use crate::storage::{LocalStorage, StorageError, keys, load_json, save_json};

/// Errors from wishlist loads and mutations.
#[derive(Debug, Error)]
pub enum WishlistError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Server side of the authenticated wishlist.
pub trait WishlistRemote: Send + Sync {
    /// Fetch the user's full wishlist.
    fn fetch_wishlist(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Vec<WishlistItem>, ApiError>> + Send;

    /// Flip membership of a product; the server decides add or remove.
    fn toggle_membership(
        &self,
        identity: &Identity,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

impl<T: WishlistRemote> WishlistRemote for Arc<T> {
    fn fetch_wishlist(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Vec<WishlistItem>, ApiError>> + Send {
        (**self).fetch_wishlist(identity)
    }

    fn toggle_membership(
        &self,
        identity: &Identity,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).toggle_membership(identity, product_id)
    }
}

/// Wishlist state container.
///
/// Cheap to clone; clones share state. The internal lock is never held across
/// a network call.
pub struct WishlistStore<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for WishlistStore<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> std::fmt::Debug for WishlistStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("WishlistStore")
            .field("phase", &state.phase)
            .field("authenticated", &state.identity.is_some())
            .field("items", &state.items.len())
            .finish_non_exhaustive()
    }
}

struct Inner<R> {
    remote: R,
    storage: Arc<dyn LocalStorage>,
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    phase: LoadState,
    identity: Option<Identity>,
    epoch: u64,
    revision: u64,
    items: Vec<WishlistItem>,
}

impl State {
    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product_id == product_id)
    }

    fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

/// Keep the first entry per product.
fn dedupe(items: Vec<WishlistItem>) -> Vec<WishlistItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.product_id))
        .collect()
}

impl<R: WishlistRemote> WishlistStore<R> {
    /// Create an uninitialized store. Call [`WishlistStore::set_identity`] to
    /// load it.
    #[must_use]
    pub fn new(remote: R, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                storage,
                state: RwLock::default(),
            }),
        }
    }

    /// Current loading phase.
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.read().phase
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state() == LoadState::Loading
    }

    /// The identity the store is loaded for.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.read().identity.clone()
    }

    /// Snapshot of the current entries.
    #[must_use]
    pub fn items(&self) -> Vec<WishlistItem> {
        self.read().items.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }

    /// Whether `product_id` is on the list.
    #[must_use]
    pub fn is_in_wishlist(&self, product_id: ProductId) -> bool {
        self.read().position(product_id).is_some()
    }

    /// Switch identity and reload from the matching source.
    ///
    /// On failure the store ends `Ready` with an empty list and the error is
    /// returned. If the list was mutated while the load was in flight, the
    /// load result is dropped and the mutated list is kept.
    ///
    /// # Errors
    ///
    /// Returns the fetch error (authenticated) or the storage error (guest).
    #[instrument(skip_all, fields(user_id = identity.as_ref().map(|i| i.user_id.as_i64())))]
    pub async fn set_identity(&self, identity: Option<Identity>) -> Result<(), WishlistError> {
        let (epoch, revision) = {
            let mut state = self.write();
            state.epoch += 1;
            state.identity.clone_from(&identity);
            state.items.clear();
            state.phase = LoadState::Loading;
            (state.epoch, state.revision)
        };

        let loaded = match &identity {
            Some(identity) => self
                .inner
                .remote
                .fetch_wishlist(identity)
                .await
                .map_err(WishlistError::from),
            None => load_json::<Vec<WishlistItem>>(self.inner.storage.as_ref(), keys::WISHLIST)
                .map(Option::unwrap_or_default)
                .map_err(WishlistError::from),
        };

        let mut state = self.write();
        if state.epoch != epoch {
            debug!("Discarding wishlist load for superseded identity");
            return Ok(());
        }
        state.phase = LoadState::Ready;
        if state.revision != revision {
            // A mutation landed during the load and resynced on its own.
            debug!("Keeping wishlist entries changed during load");
            return loaded.map(|_| ());
        }
        state.bump_revision();
        match loaded {
            Ok(items) => {
                state.items = dedupe(items);
                debug!(items = state.items.len(), "Wishlist loaded");
                Ok(())
            }
            Err(e) => {
                state.items.clear();
                Err(e)
            }
        }
    }

    /// Reload for the current identity.
    ///
    /// # Errors
    ///
    /// See [`WishlistStore::set_identity`].
    pub async fn reload(&self) -> Result<(), WishlistError> {
        let identity = self.identity();
        self.set_identity(identity).await
    }

    /// Add if absent, remove if present.
    ///
    /// # Errors
    ///
    /// See [`WishlistStore::add_to_wishlist`] and
    /// [`WishlistStore::remove_from_wishlist`].
    pub async fn toggle_wishlist(&self, product: &Product) -> Result<WishlistChange, WishlistError> {
        if self.is_in_wishlist(product.id) {
            self.remove_from_wishlist(product.id).await
        } else {
            self.add_to_wishlist(product).await
        }
    }

    /// Save `product`. Already-saved products are left alone.
    ///
    /// # Errors
    ///
    /// Guest: the snapshot could not be written (the list is unchanged).
    /// Authenticated: the toggle call failed (the local add is rolled back).
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_wishlist(&self, product: &Product) -> Result<WishlistChange, WishlistError> {
        let (identity, epoch) = {
            let mut state = self.write();
            if state.position(product.id).is_some() {
                return Ok(WishlistChange::Unchanged);
            }
            let item = WishlistItem::local(product);

            let Some(identity) = state.identity.clone() else {
                let mut next = state.items.clone();
                next.push(item);
                save_json(self.inner.storage.as_ref(), keys::WISHLIST, &next)?;
                state.items = next;
                state.bump_revision();
                debug!("Added to guest wishlist");
                return Ok(WishlistChange::Added);
            };

            state.items.push(item);
            state.bump_revision();
            (identity, state.epoch)
        };

        let product_id = product.id;
        self.push_toggle(&identity, epoch, product_id, move |items| {
            items.retain(|item| item.product_id != product_id);
        })
        .await?;
        Ok(WishlistChange::Added)
    }

    /// Remove `product_id`. Absent products are left alone.
    ///
    /// # Errors
    ///
    /// Guest: the snapshot could not be written (the list is unchanged).
    /// Authenticated: the toggle call failed (the entry is restored).
    #[instrument(skip(self))]
    pub async fn remove_from_wishlist(
        &self,
        product_id: ProductId,
    ) -> Result<WishlistChange, WishlistError> {
        let (identity, epoch, index, removed) = {
            let mut state = self.write();
            let Some(index) = state.position(product_id) else {
                return Ok(WishlistChange::Unchanged);
            };

            let Some(identity) = state.identity.clone() else {
                let mut next = state.items.clone();
                next.remove(index);
                save_json(self.inner.storage.as_ref(), keys::WISHLIST, &next)?;
                state.items = next;
                state.bump_revision();
                debug!("Removed from guest wishlist");
                return Ok(WishlistChange::Removed);
            };

            let removed = state.items.remove(index);
            state.bump_revision();
            (identity, state.epoch, index, removed)
        };

        self.push_toggle(&identity, epoch, product_id, move |items| {
            if !items.iter().any(|item| item.product_id == product_id) {
                items.insert(index.min(items.len()), removed);
            }
        })
        .await?;
        Ok(WishlistChange::Removed)
    }

    /// Send the toggle for an optimistic change, then resync.
    async fn push_toggle(
        &self,
        identity: &Identity,
        epoch: u64,
        product_id: ProductId,
        rollback: impl FnOnce(&mut Vec<WishlistItem>) + Send,
    ) -> Result<(), WishlistError> {
        if let Err(e) = self.inner.remote.toggle_membership(identity, product_id).await {
            warn!(error = %e, product_id = %product_id, "Wishlist toggle failed, rolling back");
            let id = product_id.to_string();
            add_breadcrumb(
                "wishlist",
                "Wishlist toggle failed",
                Some(&[("product_id", id.as_str())]),
            );

            let mut state = self.write();
            if state.epoch == epoch {
                rollback(&mut state.items);
                state.bump_revision();
            }
            return Err(e.into());
        }

        self.resync(identity, epoch).await;
        Ok(())
    }

    /// Replace local entries with the server list.
    ///
    /// A failed refetch keeps the optimistic state; the toggle itself went
    /// through.
    async fn resync(&self, identity: &Identity, epoch: u64) {
        let revision = self.write().bump_revision();

        match self.inner.remote.fetch_wishlist(identity).await {
            Ok(items) => {
                let mut state = self.write();
                if state.epoch == epoch && state.revision == revision {
                    state.items = dedupe(items);
                } else {
                    debug!("Discarding stale wishlist refetch");
                }
            }
            Err(e) => {
                warn!(error = %e, "Wishlist refetch failed, keeping local state");
            }
        }
    }
}

impl<R> WishlistStore<R> {
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
