//! Top-level error type and Sentry helpers.
//!
//! Each subsystem has its own error enum; [`StorefrontError`] wraps them for
//! callers that drive the whole [`Storefront`](crate::app::Storefront).

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::session::SessionError;
use crate::storage::StorageError;
use crate::wishlist::WishlistError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Backend API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Login or logout failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Wishlist load or mutation failed.
    #[error("Wishlist error: {0}")]
    Wishlist(#[from] WishlistError),

    /// The HTTP listener could not be bound or failed while serving.
    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),
}

impl StorefrontError {
    /// Whether the error is worth reporting to Sentry.
    ///
    /// Rejected credentials and expired tokens are expected user-facing
    /// outcomes, not faults.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        !matches!(
            self,
            Self::Api(ApiError::Unauthorized)
                | Self::Session(SessionError::Api(ApiError::Unauthorized) | SessionError::InvalidEmail(_))
        )
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Capture an error to Sentry (when reportable) and log it.
pub fn report(error: &StorefrontError) {
    if error.is_reportable() {
        let event_id = sentry::capture_error(error);
        tracing::error!(error = %error, sentry_event_id = %event_id, "Storefront error");
    } else {
        tracing::info!(error = %error, "Storefront request rejected");
    }
}

/// Set the Sentry user context.
///
/// Call this after login to associate errors with the user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a user action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("wishlist", "Wishlist toggle failed", Some(&[("product_id", "7")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
