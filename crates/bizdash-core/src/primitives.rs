//! # Primitives
//!
//! Fixed constants for the bizdash core. Compiled in and immutable at runtime.

/// Route an unauthenticated actor is sent to.
pub const SIGN_IN_ROUTE: &str = "/login";

/// Route an actor is sent to after a permission denial.
pub const DEFAULT_ROUTE: &str = "/dashboard";

/// Collection id meaning "no collection selected". Ignored by the filter builder.
pub const NONE_SENTINEL: &str = "none";

/// Aged stock is anything created more than this many calendar months ago.
pub const AGED_STOCK_MONTHS: u32 = 6;

// =============================================================================
// TABLES
// =============================================================================

/// Table holding products (read-only to the core).
pub const PRODUCTS_TABLE: &str = "products";

/// Table holding saved catalogs.
pub const CATALOGS_TABLE: &str = "catalogs";

/// Table holding users (id, email, role).
pub const USERS_TABLE: &str = "users";

/// Table holding per-role grants.
pub const ROLE_PERMISSIONS_TABLE: &str = "role_permissions";

/// Maximum length of a table name accepted by the stores.
pub const MAX_TABLE_NAME_LENGTH: usize = 63;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a catalog name, in characters.
pub const MAX_CATALOG_NAME_LENGTH: usize = 120;

/// Maximum number of ids in any one filter list.
pub const MAX_FILTER_IDS: usize = 500;

/// Maximum number of products listed in a WhatsApp hand-off message.
pub const MAX_SHARE_PRODUCTS: usize = 20;

/// Phone numbers must have between this many digits...
pub const MIN_PHONE_DIGITS: usize = 8;

/// ...and this many (E.164).
pub const MAX_PHONE_DIGITS: usize = 15;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aged_stock_window_is_six_months() {
        assert_eq!(AGED_STOCK_MONTHS, 6);
    }

    #[test]
    fn sentinel_is_lowercase() {
        assert_eq!(NONE_SENTINEL, NONE_SENTINEL.to_lowercase());
    }
}
