//! # Messaging Hand-off
//!
//! Builds the WhatsApp click-to-chat link that shares a catalog with a
//! customer. Nothing is sent from here; the link opens WhatsApp with the
//! message pre-filled.

use crate::DashError;
use crate::catalog::Product;
use crate::export::format_price;
use crate::primitives::{MAX_PHONE_DIGITS, MAX_SHARE_PRODUCTS, MIN_PHONE_DIGITS};
use url::Url;

/// Click-to-chat endpoint; the phone number is the path.
pub const WHATSAPP_BASE_URL: &str = "https://wa.me/";

/// Digits of an international phone number.
///
/// A leading `+` and spaces, dashes, dots or parentheses are accepted and
/// dropped; anything else is a validation error.
pub fn normalize_phone(raw: &str) -> Result<String, DashError> {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let mut digits = String::with_capacity(body.len());
    for c in body.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => {
                return Err(DashError::Validation(format!(
                    "phone number contains '{}'",
                    c
                )));
            }
        }
    }

    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()) {
        return Err(DashError::Validation(format!(
            "phone number must have {} to {} digits",
            MIN_PHONE_DIGITS, MAX_PHONE_DIGITS
        )));
    }
    Ok(digits)
}

/// The pre-filled message: catalog name, product count, then up to
/// `MAX_SHARE_PRODUCTS` lines of `SKU - Name - Rs. price`.
#[must_use]
pub fn share_message(catalog_name: &str, products: &[Product]) -> String {
    let mut message = format!("*{}*\n", catalog_name.trim());
    message.push_str(&match products.len() {
        1 => "1 product\n".to_string(),
        n => format!("{} products\n", n),
    });

    for product in products.iter().take(MAX_SHARE_PRODUCTS) {
        message.push_str(&format!(
            "\n{} - {} - Rs. {}",
            product.sku,
            product.name,
            format_price(product.mrp)
        ));
    }
    if products.len() > MAX_SHARE_PRODUCTS {
        message.push_str(&format!(
            "\n\u{2026}and {} more",
            products.len() - MAX_SHARE_PRODUCTS
        ));
    }
    message
}

/// `https://wa.me/<digits>?text=<message>` for this catalog.
pub fn share_link(phone: &str, catalog_name: &str, products: &[Product]) -> Result<Url, DashError> {
    let digits = normalize_phone(phone)?;
    let message = share_message(catalog_name, products);
    Url::parse_with_params(&format!("{}{}", WHATSAPP_BASE_URL, digits), &[("text", message)])
        .map_err(|e| DashError::Validation(format!("share link: {}", e)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product(i: usize) -> Product {
        Product {
            id: i.to_string(),
            sku: format!("S{}", i),
            name: format!("Item {}", i),
            category: "Misc".to_string(),
            mrp: Decimal::new(195, 1),
            collection: None,
            subcategory: None,
            status: None,
            created_at: None,
        }
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("+91 98765-43210").ok().as_deref(), Some("919876543210"));
        assert_eq!(normalize_phone("(022) 2345 6789").ok().as_deref(), Some("02223456789"));
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("1234567890123456").is_err());
        assert!(normalize_phone("98765x43210").is_err());
        assert!(normalize_phone("").is_err());
    }

    #[test]
    fn message_lists_products_with_prices() {
        let message = share_message("Summer", &[product(1)]);
        assert_eq!(message, "*Summer*\n1 product\n\nS1 - Item 1 - Rs. 19.50");
    }

    #[test]
    fn long_lists_are_truncated() {
        let products: Vec<Product> = (0..MAX_SHARE_PRODUCTS + 3).map(product).collect();
        let message = share_message("Big", &products);
        assert_eq!(message.matches(" - Rs. ").count(), MAX_SHARE_PRODUCTS);
        assert!(message.ends_with("\u{2026}and 3 more"));
    }

    #[test]
    fn link_targets_wa_me_with_encoded_text() {
        let url = share_link("+91 98765 43210", "Summer & Co", &[product(1)]).expect("link");
        assert_eq!(url.host_str(), Some("wa.me"));
        assert_eq!(url.path(), "/919876543210");
        let text = url
            .query_pairs()
            .find(|(k, _)| k == "text")
            .map(|(_, v)| v.into_owned())
            .expect("text param");
        assert_eq!(text, share_message("Summer & Co", &[product(1)]));
    }
}
