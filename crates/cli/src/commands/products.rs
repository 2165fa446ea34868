//! Catalog listing.

use rocketshoes_cart::{CartConfig, CatalogClient, CatalogError, CatalogService};
use rocketshoes_core::StockInfo;
use tracing::warn;

use super::{CliError, render};

/// Print every catalog product with its stock and how many are in the cart.
///
/// A product whose stock cannot be fetched is listed without a stock figure.
///
/// # Errors
///
/// Returns an error if the listing cannot be fetched or the storage file
/// cannot be read.
#[allow(clippy::print_stdout)]
pub async fn list(config: &CartConfig) -> Result<(), CliError> {
    let store = super::open_store(config)?;
    let catalog: &CatalogClient = store.catalog();
    let cart = store.current_cart();

    let products = catalog.products().await?;

    let mut rows = Vec::with_capacity(products.len());
    for product in products {
        let stock = match catalog.stock(product.id).await {
            Ok(StockInfo { amount, .. }) => Some(amount),
            Err(e @ (CatalogError::NotFound(_) | CatalogError::Status { .. })) => {
                warn!(product_id = %product.id, error = %e, "Stock unavailable");
                None
            }
            Err(e) => return Err(e.into()),
        };
        let in_cart = cart.find(product.id).map_or(0, |item| item.amount());
        rows.push(render::ProductRow {
            product,
            stock,
            in_cart,
        });
    }

    print!("{}", render::products(&rows));
    Ok(())
}
