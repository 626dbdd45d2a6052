//! Cache key builders for RentShare
//!
//! Invalidation works by key prefix, so the naming scheme matters:
//!
//! - `search_…` - every cached search result page; dropped on any item change
//! - `item_{id}` - one item, and `item_{id}_…` for data hanging off it
//! - `user_{id}` - one profile, and `user_{id}_…` for data hanging off it
//! - `categories` - the category list
//!
//! # Example
//!
//! ```
//! use rentshare_cache::keys;
//! use uuid::Uuid;
//!
//! let id = Uuid::nil();
//! assert_eq!(keys::item_key(id), "item_00000000-0000-0000-0000-000000000000");
//! assert!(keys::item_reviews_key(id).starts_with(&keys::item_key(id)));
//! ```

use uuid::Uuid;

/// Prefix shared by all cached search results
pub const SEARCH_PREFIX: &str = "search_";

/// Prefix for per-item keys
pub const ITEM_PREFIX: &str = "item_";

/// Prefix for per-user keys
pub const USER_PREFIX: &str = "user_";

/// Key of the cached category list
pub const CATEGORIES_KEY: &str = "categories";

/// Namespace for entries in the persistent store
pub const STORAGE_PREFIX: &str = "cache_";

/// TTL for search result pages (1 minute)
pub const SEARCH_TTL_SECS: u64 = 60;

/// TTL for item details (5 minutes)
pub const ITEM_TTL_SECS: u64 = 300;

/// TTL for profiles and rating summaries (5 minutes)
pub const USER_TTL_SECS: u64 = 300;

/// TTL for the category list (1 hour)
pub const CATEGORIES_TTL_SECS: u64 = 3600;

/// Key for an item's details
pub fn item_key(item_id: Uuid) -> String {
    format!("{}{}", ITEM_PREFIX, item_id)
}

/// Key for an item's rating summary
pub fn item_reviews_key(item_id: Uuid) -> String {
    format!("{}{}_reviews", ITEM_PREFIX, item_id)
}

/// Key for an item's image list
pub fn item_images_key(item_id: Uuid) -> String {
    format!("{}{}_images", ITEM_PREFIX, item_id)
}

/// Key for a user's public profile
pub fn user_key(user_id: Uuid) -> String {
    format!("{}{}", USER_PREFIX, user_id)
}

/// Key for a user's rating summary
pub fn user_reviews_key(user_id: Uuid) -> String {
    format!("{}{}_reviews", USER_PREFIX, user_id)
}

/// Namespaced key in the persistent store
pub fn storage_key(key: &str) -> String {
    format!("{}{}", STORAGE_PREFIX, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_keys_share_entity_prefix() {
        let id = Uuid::new_v4();
        let base = item_key(id);
        assert!(item_reviews_key(id).starts_with(&base));
        assert!(item_images_key(id).starts_with(&base));
        assert!(user_reviews_key(id).starts_with(&user_key(id)));
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(storage_key("search_q=drill"), "cache_search_q=drill");
    }
}
