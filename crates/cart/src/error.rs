//! Cart operation errors.
//!
//! Every failed operation leaves the cart exactly as it was. The error says
//! which operation failed and why; [`CartError::user_message`] gives the text
//! the storefront shows in its notification popup.

use rocketshoes_core::{AmountError, ProductId};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::storage::StorageError;

/// Error returned by [`CartStore`](crate::CartStore) operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Adding a product failed for a reason other than stock.
    #[error("Failed to add product {product_id}: {source}")]
    AdditionFailed {
        product_id: ProductId,
        #[source]
        source: CartFault,
    },

    /// Removing a product failed.
    #[error("Failed to remove product {product_id}: {source}")]
    RemovalFailed {
        product_id: ProductId,
        #[source]
        source: CartFault,
    },

    /// Changing a product's amount failed for a reason other than stock.
    #[error("Failed to update amount of product {product_id}: {source}")]
    UpdateFailed {
        product_id: ProductId,
        #[source]
        source: CartFault,
    },

    /// The catalog does not have enough units.
    #[error("Product {product_id} out of stock: requested {requested}, available {available}")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },
}

/// Underlying cause of a failed cart operation.
#[derive(Debug, Error)]
pub enum CartFault {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("product is not in the cart")]
    NotInCart,

    #[error("catalog returned product {0} instead")]
    UnexpectedProduct(ProductId),

    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// Discriminant of [`CartError`] for callers that only need the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartErrorKind {
    AdditionFailed,
    RemovalFailed,
    UpdateFailed,
    OutOfStock,
}

impl CartError {
    pub(crate) fn addition(product_id: ProductId, source: impl Into<CartFault>) -> Self {
        Self::AdditionFailed {
            product_id,
            source: source.into(),
        }
    }

    pub(crate) fn removal(product_id: ProductId, source: impl Into<CartFault>) -> Self {
        Self::RemovalFailed {
            product_id,
            source: source.into(),
        }
    }

    pub(crate) fn update(product_id: ProductId, source: impl Into<CartFault>) -> Self {
        Self::UpdateFailed {
            product_id,
            source: source.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> CartErrorKind {
        match self {
            Self::AdditionFailed { .. } => CartErrorKind::AdditionFailed,
            Self::RemovalFailed { .. } => CartErrorKind::RemovalFailed,
            Self::UpdateFailed { .. } => CartErrorKind::UpdateFailed,
            Self::OutOfStock { .. } => CartErrorKind::OutOfStock,
        }
    }

    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        match self {
            Self::AdditionFailed { product_id, .. }
            | Self::RemovalFailed { product_id, .. }
            | Self::UpdateFailed { product_id, .. }
            | Self::OutOfStock { product_id, .. } => *product_id,
        }
    }

    /// Notification text shown to the shopper.
    ///
    /// Internal details (HTTP status, I/O errors) are never exposed here.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }
}

impl CartErrorKind {
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::AdditionFailed => "Erro na adição do produto",
            Self::RemovalFailed => "Erro na remoção do produto",
            Self::UpdateFailed => "Erro na alteração de quantidade do produto",
            Self::OutOfStock => "Quantidade solicitada fora de estoque",
        }
    }
}
