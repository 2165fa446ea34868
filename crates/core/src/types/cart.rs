//! Cart line items and the cart itself.
//!
//! The cart is an ordered list with at most one [`LineItem`] per product.
//! Insertion order is the order products were first added and only matters
//! for display.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ProductId;
use super::product::Product;

/// Error returned when a line item would hold fewer than one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("line item amount must be at least 1")]
pub struct AmountError;

/// One product entry in the cart with its requested quantity.
///
/// Serializes as the product record with an extra `amount` field, which is
/// the shape the storefront has always persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredLineItem")]
pub struct LineItem {
    #[serde(flatten)]
    pub product: Product,
    amount: u32,
}

#[derive(Deserialize)]
struct StoredLineItem {
    #[serde(flatten)]
    product: Product,
    amount: u32,
}

impl TryFrom<StoredLineItem> for LineItem {
    type Error = AmountError;

    fn try_from(stored: StoredLineItem) -> Result<Self, Self::Error> {
        Self::with_amount(stored.product, stored.amount)
    }
}

impl LineItem {
    /// Create a line item holding a single unit of `product`.
    ///
    /// An `amount` carried in the product's extra fields is dropped; the
    /// line item's own amount replaces it.
    #[must_use]
    pub fn new(product: Product) -> Self {
        Self {
            product: without_amount(product),
            amount: 1,
        }
    }

    /// Create a line item with an explicit amount.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if `amount` is zero.
    pub fn with_amount(product: Product, amount: u32) -> Result<Self, AmountError> {
        if amount == 0 {
            return Err(AmountError);
        }
        Ok(Self {
            product: without_amount(product),
            amount,
        })
    }

    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.product.id
    }

    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.amount
    }

    /// Set the amount.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if `amount` is zero; the item is left as it was.
    pub const fn set_amount(&mut self, amount: u32) -> Result<(), AmountError> {
        if amount == 0 {
            return Err(AmountError);
        }
        self.amount = amount;
        Ok(())
    }

    /// Unit price times amount.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.amount)
    }
}

/// Catalog records may carry their own `amount` (e.g. a stock figure). It
/// would collide with the line item's flattened `amount` key.
fn without_amount(mut product: Product) -> Product {
    product.extra.remove("amount");
    product
}

/// Ordered sequence of line items.
///
/// Serializes as a plain JSON array. Deserializing drops any repeated
/// product after its first entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LineItem>", into = "Vec<LineItem>")]
pub struct Cart {
    items: Vec<LineItem>,
}

impl From<Vec<LineItem>> for Cart {
    fn from(items: Vec<LineItem>) -> Self {
        Self::from_items(items)
    }
}

impl From<Cart> for Vec<LineItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from line items, keeping the first entry for any
    /// product that appears more than once.
    #[must_use]
    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut cart = Self::empty();
        for item in items {
            if cart.find(item.id()).is_none() {
                cart.items.push(item);
            }
        }
        cart
    }

    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    #[must_use]
    pub fn find(&self, id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn find_mut(&mut self, id: ProductId) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.find(id).is_some()
    }

    /// Append a line item.
    ///
    /// Returns the item back if the cart already holds that product.
    ///
    /// # Errors
    ///
    /// Returns the rejected item when its product is already in the cart.
    pub fn push(&mut self, item: LineItem) -> Result<(), LineItem> {
        if self.contains(item.id()) {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    /// Remove the line item for `id`, returning it if present.
    pub fn remove(&mut self, id: ProductId) -> Option<LineItem> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all line item amounts.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.amount())).sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }
}
