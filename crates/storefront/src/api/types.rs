//! Request and response payloads for the storefront backend.

use ebasi_core::{Email, UserId};
use serde::{Deserialize, Serialize};

/// A list endpoint response.
///
/// Depending on the view, the backend returns either a bare array or a
/// paginated envelope with the items under `results`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Plain(Vec<T>),
    Paginated { results: Vec<T> },
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Plain(items) | Self::Paginated { results: items } => items,
        }
    }
}

/// Body of `POST /orders/wishlist/toggle/`.
#[derive(Debug, Serialize)]
pub struct ToggleWishlistRequest {
    pub product_id: i64,
}

/// Response of `POST /accounts/login/`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub email: Option<Email>,
}

/// Response of `GET /accounts/profile/`.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub email: Email,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_accepts_both_shapes() {
        let plain: Listing<u32> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(plain.into_items(), vec![1, 2]);

        let paged: Listing<u32> =
            serde_json::from_str(r#"{"count": 2, "next": null, "results": [3, 4]}"#).unwrap();
        assert_eq!(paged.into_items(), vec![3, 4]);
    }

    #[test]
    fn test_profile_tolerates_missing_names() {
        let profile: Profile =
            serde_json::from_str(r#"{"id": 12, "email": "priya@ebasi.store"}"#).unwrap();
        assert_eq!(profile.id, UserId::new(12));
        assert!(profile.first_name.is_empty());
    }
}
