//! Serialization contract for the stored cart.
//!
//! Current shape:
//!
//! ```json
//! { "version": 1, "items": [ { "id": 1, "title": "...", "price": 179.9, "image": "...", "amount": 2 } ] }
//! ```
//!
//! Earlier storefront builds wrote the bare `items` array with no envelope.
//! That shape is still accepted on read and is upgraded on the next write.

use rocketshoes_core::Cart;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version written by [`encode_cart`].
pub const CART_FORMAT_VERSION: u32 = 1;

/// Errors that can occur when decoding a stored cart.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid cart JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported cart format version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    items: &'a Cart,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCart {
    Versioned { version: u32, items: Cart },
    Legacy(Cart),
}

/// Encode a cart in the current format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_cart(cart: &Cart) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Envelope {
        version: CART_FORMAT_VERSION,
        items: cart,
    })
}

/// Decode a stored cart in the current or the legacy format.
///
/// # Errors
///
/// Returns an error if the value is not valid cart JSON or was written by a
/// newer format version.
pub fn decode_cart(raw: &str) -> Result<Cart, DecodeError> {
    match serde_json::from_str::<StoredCart>(raw)? {
        StoredCart::Versioned { version, items } if version == CART_FORMAT_VERSION => Ok(items),
        StoredCart::Versioned { version, .. } => Err(DecodeError::UnsupportedVersion(version)),
        StoredCart::Legacy(items) => Ok(items),
    }
}
