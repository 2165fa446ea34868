//! Cart commands.

use rocketshoes_cart::{CartConfig, UpdateProductAmount};
use rocketshoes_core::ProductId;
use tracing::info;

use super::{CliError, open_store, render};

/// Print the cart.
///
/// # Errors
///
/// Returns an error if the storage file cannot be read.
#[allow(clippy::print_stdout)]
pub fn show(config: &CartConfig) -> Result<(), CliError> {
    let store = open_store(config)?;
    print!("{}", render::cart(&store.current_cart()));
    Ok(())
}

/// Add one unit of a product and print the resulting cart.
///
/// # Errors
///
/// Returns an error if the product is out of stock or the catalog or
/// storage fails.
#[allow(clippy::print_stdout)]
pub async fn add(config: &CartConfig, product_id: ProductId) -> Result<(), CliError> {
    let store = open_store(config)?;
    let cart = store.add_product(product_id).await?;
    info!(product_id = %product_id, items = cart.len(), "Product added");
    print!("{}", render::cart(&cart));
    Ok(())
}

/// Remove a product and print the resulting cart.
///
/// # Errors
///
/// Returns an error if the product is not in the cart or storage fails.
#[allow(clippy::print_stdout)]
pub async fn remove(config: &CartConfig, product_id: ProductId) -> Result<(), CliError> {
    let store = open_store(config)?;
    let cart = store.remove_product(product_id).await?;
    info!(product_id = %product_id, items = cart.len(), "Product removed");
    print!("{}", render::cart(&cart));
    Ok(())
}

/// Set a product's amount and print the resulting cart.
///
/// # Errors
///
/// Returns an error if the product is not in the cart, the stock is too low,
/// or the catalog or storage fails.
#[allow(clippy::print_stdout)]
pub async fn update(
    config: &CartConfig,
    product_id: ProductId,
    amount: i32,
) -> Result<(), CliError> {
    let store = open_store(config)?;
    let cart = store
        .update_product_amount(UpdateProductAmount { product_id, amount })
        .await?;
    info!(product_id = %product_id, amount, "Product amount updated");
    print!("{}", render::cart(&cart));
    Ok(())
}
