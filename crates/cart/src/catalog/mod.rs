//! Product and stock catalog.
//!
//! # Architecture
//!
//! - The catalog is the source of truth for stock - levels are fetched for
//!   every operation that needs them and never cached
//! - Product records change rarely and are cached in-memory via `moka`
//!
//! # Endpoints
//!
//! - `GET /stock/{id}` - `{ id, amount }`
//! - `GET /products/{id}` - a single product record
//! - `GET /products` - every product record

mod cache;
mod client;

use std::sync::Arc;

use async_trait::async_trait;
use rocketshoes_core::{Product, ProductId, StockInfo};
use thiserror::Error;

pub use client::CatalogClient;

/// Errors that can occur when talking to the catalog API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success response.
    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Read-only access to product and stock data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Available quantity for a product.
    async fn stock(&self, id: ProductId) -> Result<StockInfo, CatalogError>;

    /// Full record for a product.
    async fn product(&self, id: ProductId) -> Result<Product, CatalogError>;

    /// Every product in the catalog.
    async fn products(&self) -> Result<Vec<Product>, CatalogError>;
}

#[async_trait]
impl<T: CatalogService + ?Sized> CatalogService for Arc<T> {
    async fn stock(&self, id: ProductId) -> Result<StockInfo, CatalogError> {
        (**self).stock(id).await
    }

    async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        (**self).product(id).await
    }

    async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        (**self).products().await
    }
}
