//! Cache types for catalog API responses.

use std::sync::Arc;

use rocketshoes_core::{Product, ProductId};

/// Cache key for product records.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Arc<Vec<Product>>),
}
