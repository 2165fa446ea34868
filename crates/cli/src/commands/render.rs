//! Plain-text rendering of carts and product listings.

use std::fmt::Write;

use rocketshoes_core::{Cart, Product, format_price};

/// One line of the `products` listing.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub product: Product,
    /// `None` when the stock endpoint did not answer.
    pub stock: Option<u32>,
    pub in_cart: u32,
}

/// Render the cart with line totals, item count and subtotal.
#[must_use]
pub fn cart(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Carrinho vazio\n".to_string();
    }

    let mut out = String::new();
    for item in cart.items() {
        let _ = writeln!(out, "#{} {}", item.id(), item.product.title);
        let _ = writeln!(
            out,
            "    {} x {} = {}",
            item.amount(),
            format_price(item.product.price),
            format_price(item.line_total()),
        );
    }
    let _ = writeln!(out, "Itens: {}", cart.total_quantity());
    let _ = writeln!(out, "Total: {}", format_price(cart.subtotal()));
    out
}

/// Render the catalog listing.
#[must_use]
pub fn products(rows: &[ProductRow]) -> String {
    if rows.is_empty() {
        return "Nenhum produto disponível\n".to_string();
    }

    let mut out = String::new();
    for row in rows {
        let stock = row
            .stock
            .map_or_else(|| "?".to_string(), |amount| amount.to_string());
        let _ = writeln!(
            out,
            "#{} {} - {} (estoque: {}, no carrinho: {})",
            row.product.id,
            row.product.title,
            format_price(row.product.price),
            stock,
            row.in_cart,
        );
    }
    out
}
