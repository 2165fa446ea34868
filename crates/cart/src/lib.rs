//! RocketShoes cart library.
//!
//! Client-side cart state for the storefront: adding products, removing
//! them and adjusting quantities, with every change written to a local
//! key-value store and quantity increases checked against the catalog's
//! stock endpoint.
//!
//! # Architecture
//!
//! - [`store::CartStore`] owns the in-memory cart and is the only thing that
//!   mutates it. Its two collaborators are injected.
//! - [`storage::PersistenceBackend`] is a synchronous key-value store. The
//!   cart lives under [`storage::CART_KEY`] and is rewritten wholesale after
//!   every successful mutation.
//! - [`catalog::CatalogService`] is the read-only product/stock API. The
//!   HTTP implementation is [`catalog::CatalogClient`].
//!
//! # Example
//!
//! ```rust,ignore
//! use rocketshoes_cart::{CartConfig, CartStore, CatalogClient, FileStorage};
//!
//! let config = CartConfig::from_env()?;
//! let catalog = CatalogClient::new(&config.catalog)?;
//! let store = CartStore::load(FileStorage::new(&config.storage_path), catalog)?;
//!
//! let cart = store.add_product(ProductId::new(1)).await?;
//! println!("{} items", cart.total_quantity());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod storage;
pub mod store;

pub use catalog::{CatalogClient, CatalogError, CatalogService};
pub use config::{CartConfig, CatalogConfig, ConfigError};
pub use error::{CartError, CartErrorKind, CartFault};
pub use storage::{CART_KEY, FileStorage, MemoryStorage, PersistenceBackend, StorageError};
pub use store::{CartStore, UpdateProductAmount};
