//! Command implementations.

pub mod cart;
pub mod products;
pub mod render;

use rocketshoes_cart::{
    CartConfig, CartError, CartStore, CatalogClient, CatalogError, ConfigError, FileStorage,
    StorageError,
};
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Cart store the commands operate on.
pub type Store = CartStore<FileStorage, CatalogClient>;

/// Open the cart at the configured storage path.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or the storage file
/// cannot be read.
pub fn open_store(config: &CartConfig) -> Result<Store, CliError> {
    let catalog = CatalogClient::new(&config.catalog)?;
    let storage = FileStorage::new(&config.storage_path);
    Ok(CartStore::load(storage, catalog)?)
}

/// Report a failed command on stderr.
///
/// Cart errors show the shopper-facing notification text; the detailed cause
/// goes to the log.
#[allow(clippy::print_stderr)]
pub fn report(err: &CliError) {
    match err {
        CliError::Cart(cart_err) => {
            tracing::warn!(error = %cart_err, kind = ?cart_err.kind(), "Cart operation failed");
            eprintln!("{}", cart_err.user_message());
        }
        other => {
            tracing::error!(error = %other, "Command failed");
            eprintln!("{other}");
        }
    }
}
