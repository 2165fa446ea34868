//! The cart store.
//!
//! [`CartStore`] owns the shopper's cart. It loads the cart from storage once,
//! and each mutation runs as a single step: check the catalog if needed,
//! build the new cart, write it to storage, then publish it in memory. A
//! failure at any step leaves both storage and memory untouched.
//!
//! Mutations are serialized: a second call waits until the first one has
//! finished, including its catalog requests. Reads via
//! [`CartStore::current_cart`] never wait on the network.

use std::sync::{PoisonError, RwLock};

use rocketshoes_core::{Cart, LineItem, ProductId};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::catalog::CatalogService;
use crate::error::{CartError, CartFault};
use crate::storage::{CART_KEY, PersistenceBackend, StorageError, decode_cart, encode_cart};

/// Target amount for [`CartStore::update_product_amount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateProductAmount {
    pub product_id: ProductId,
    /// Absolute quantity, not a delta. Values below 1 are ignored.
    pub amount: i32,
}

/// Shopping cart backed by a key-value store and checked against the catalog.
pub struct CartStore<S, C> {
    storage: S,
    catalog: C,
    cart: RwLock<Cart>,
    mutation: Mutex<()>,
}

impl<S, C> CartStore<S, C>
where
    S: PersistenceBackend,
    C: CatalogService,
{
    /// Load the cart from `storage`.
    ///
    /// A missing entry yields an empty cart. So does an entry that cannot be
    /// decoded; that case is logged and the entry is overwritten by the next
    /// successful mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend itself cannot be read.
    pub fn load(storage: S, catalog: C) -> Result<Self, StorageError> {
        let cart = match storage.get(CART_KEY)? {
            None => Cart::empty(),
            Some(raw) => decode_cart(&raw).unwrap_or_else(|e| {
                warn!(error = %e, key = CART_KEY, "Stored cart is unreadable, starting empty");
                Cart::empty()
            }),
        };

        info!(items = cart.len(), "Cart loaded");

        Ok(Self {
            storage,
            catalog,
            cart: RwLock::new(cart),
            mutation: Mutex::new(()),
        })
    }

    /// Snapshot of the cart.
    #[must_use]
    pub fn current_cart(&self) -> Cart {
        self.cart
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub const fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Add one unit of a product.
    ///
    /// A product already in the cart has its amount raised by one; a new
    /// product is appended with amount 1. Either way the resulting amount
    /// must not exceed the catalog's stock.
    ///
    /// # Errors
    ///
    /// - [`CartError::OutOfStock`] if the stock cannot cover one more unit
    /// - [`CartError::AdditionFailed`] if the catalog or storage fails
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub async fn add_product(&self, product_id: ProductId) -> Result<Cart, CartError> {
        let _guard = self.mutation.lock().await;

        let stock = self
            .catalog
            .stock(product_id)
            .await
            .map_err(|e| CartError::addition(product_id, e))?;

        let mut cart = self.current_cart();

        if let Some(item) = cart.find_mut(product_id) {
            let requested = item.amount().saturating_add(1);
            if requested > stock.amount {
                warn!(requested, available = stock.amount, "Not enough stock to add product");
                return Err(CartError::OutOfStock {
                    product_id,
                    requested,
                    available: stock.amount,
                });
            }
            item.set_amount(requested)
                .map_err(|e| CartError::addition(product_id, e))?;
        } else {
            if stock.amount < 1 {
                warn!("Product is out of stock");
                return Err(CartError::OutOfStock {
                    product_id,
                    requested: 1,
                    available: stock.amount,
                });
            }

            let product = self
                .catalog
                .product(product_id)
                .await
                .map_err(|e| CartError::addition(product_id, e))?;
            if product.id != product_id {
                warn!(returned = %product.id, "Catalog returned a different product");
                return Err(CartError::addition(
                    product_id,
                    CartFault::UnexpectedProduct(product.id),
                ));
            }
            cart.push(LineItem::new(product)).map_err(|rejected| {
                CartError::addition(product_id, CartFault::UnexpectedProduct(rejected.id()))
            })?;
        }

        let cart = self
            .commit(cart)
            .map_err(|e| CartError::addition(product_id, e))?;
        info!(total_quantity = cart.total_quantity(), "Product added to cart");
        Ok(cart)
    }

    /// Remove a product entirely, whatever its amount.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::RemovalFailed`] if the product is not in the cart
    /// or storage fails.
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub async fn remove_product(&self, product_id: ProductId) -> Result<Cart, CartError> {
        let _guard = self.mutation.lock().await;

        let mut cart = self.current_cart();
        if cart.remove(product_id).is_none() {
            warn!("Product to remove is not in the cart");
            return Err(CartError::removal(product_id, CartFault::NotInCart));
        }

        let cart = self
            .commit(cart)
            .map_err(|e| CartError::removal(product_id, e))?;
        info!(items = cart.len(), "Product removed from cart");
        Ok(cart)
    }

    /// Set a product's amount to an absolute value.
    ///
    /// Targets below 1 are ignored and return the cart unchanged. Lowering
    /// an amount never consults the catalog; raising it requires enough stock.
    ///
    /// # Errors
    ///
    /// - [`CartError::UpdateFailed`] if the product is not in the cart, or the
    ///   catalog or storage fails
    /// - [`CartError::OutOfStock`] if the stock is below the target
    #[instrument(skip_all, fields(product_id = %update.product_id, amount = update.amount))]
    pub async fn update_product_amount(
        &self,
        update: UpdateProductAmount,
    ) -> Result<Cart, CartError> {
        let UpdateProductAmount { product_id, amount } = update;

        if amount < 1 {
            return Ok(self.current_cart());
        }
        let requested = amount.unsigned_abs();

        let _guard = self.mutation.lock().await;

        let mut cart = self.current_cart();
        let Some(current) = cart.find(product_id).map(LineItem::amount) else {
            warn!("Product to update is not in the cart");
            return Err(CartError::update(product_id, CartFault::NotInCart));
        };

        if current < requested {
            let stock = self
                .catalog
                .stock(product_id)
                .await
                .map_err(|e| CartError::update(product_id, e))?;

            if stock.amount < requested {
                warn!(requested, available = stock.amount, "Not enough stock for new amount");
                return Err(CartError::OutOfStock {
                    product_id,
                    requested,
                    available: stock.amount,
                });
            }
        }

        if let Some(item) = cart.find_mut(product_id) {
            item.set_amount(requested)
                .map_err(|e| CartError::update(product_id, e))?;
        }

        let cart = self
            .commit(cart)
            .map_err(|e| CartError::update(product_id, e))?;
        info!(total_quantity = cart.total_quantity(), "Cart amount updated");
        Ok(cart)
    }

    /// Write `cart` to storage, then publish it in memory.
    fn commit(&self, cart: Cart) -> Result<Cart, StorageError> {
        let encoded = encode_cart(&cart)?;
        self.storage.set(CART_KEY, &encoded)?;

        let mut current = self.cart.write().unwrap_or_else(PoisonError::into_inner);
        current.clone_from(&cart);
        Ok(cart)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use mockall::predicate::eq;
    use proptest::prelude::*;
    use rocketshoes_core::{Product, StockInfo};
    use rust_decimal::Decimal;

    use super::*;
    use crate::catalog::{CatalogError, MockCatalogService};
    use crate::error::CartErrorKind;
    use crate::storage::MemoryStorage;

    fn product(id: i32) -> Product {
        Product::new(
            ProductId::new(id),
            format!("Tênis {id}"),
            Decimal::new(17990, 2),
            format!("https://example.com/{id}.jpg"),
        )
    }

    fn item(id: i32, amount: u32) -> LineItem {
        LineItem::with_amount(product(id), amount).unwrap()
    }

    fn stock(id: i32, amount: u32) -> StockInfo {
        StockInfo {
            id: ProductId::new(id),
            amount,
        }
    }

    fn storage_with(items: Vec<LineItem>) -> Arc<MemoryStorage> {
        let cart = Cart::from_items(items);
        Arc::new(MemoryStorage::with_entry(
            CART_KEY,
            encode_cart(&cart).unwrap(),
        ))
    }

    fn reload(storage: &Arc<MemoryStorage>) -> Cart {
        decode_cart(&storage.get(CART_KEY).unwrap().unwrap()).unwrap()
    }

    fn amounts(cart: &Cart) -> Vec<(i32, u32)> {
        cart.items()
            .iter()
            .map(|item| (item.id().as_i32(), item.amount()))
            .collect()
    }

    /// Storage that accepts reads and fails every write.
    struct ReadOnlyStorage(MemoryStorage);

    impl PersistenceBackend for ReadOnlyStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn test_load_missing_entry_is_empty() {
        let store = CartStore::load(MemoryStorage::new(), MockCatalogService::new()).unwrap();
        assert!(store.current_cart().is_empty());
    }

    #[test]
    fn test_load_unreadable_entry_is_empty() {
        let storage = MemoryStorage::with_entry(CART_KEY, "{definitely not a cart");
        let store = CartStore::load(storage, MockCatalogService::new()).unwrap();
        assert!(store.current_cart().is_empty());
    }

    #[test]
    fn test_load_legacy_array() {
        let storage = MemoryStorage::with_entry(
            CART_KEY,
            r#"[{"id":1,"title":"Tênis","price":179.9,"image":"a.jpg","amount":2}]"#,
        );
        let store = CartStore::load(storage, MockCatalogService::new()).unwrap();
        assert_eq!(amounts(&store.current_cart()), vec![(1, 2)]);
    }

    // =========================================================================
    // add_product
    // =========================================================================

    #[tokio::test]
    async fn test_add_new_product() {
        let storage = Arc::new(MemoryStorage::new());
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_stock()
            .with(eq(ProductId::new(3)))
            .times(1)
            .returning(|_| Ok(stock(3, 5)));
        catalog
            .expect_product()
            .with(eq(ProductId::new(3)))
            .times(1)
            .returning(|_| Ok(product(3)));

        let store = CartStore::load(Arc::clone(&storage), catalog).unwrap();
        let cart = store.add_product(ProductId::new(3)).await.unwrap();

        assert_eq!(amounts(&cart), vec![(3, 1)]);
        assert_eq!(cart.items()[0].product, product(3));
        assert_eq!(store.current_cart(), cart);
        assert_eq!(reload(&storage), cart);
    }

    #[tokio::test]
    async fn test_add_record_with_own_amount_survives_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_stock()
            .times(1)
            .returning(|_| Ok(stock(1, 10)));
        catalog.expect_product().times(1).returning(|_| {
            let mut record = product(1);
            record
                .extra
                .insert("amount".to_string(), serde_json::Value::from(7));
            Ok(record)
        });

        let store = CartStore::load(Arc::clone(&storage), catalog).unwrap();
        let cart = store.add_product(ProductId::new(1)).await.unwrap();
        assert_eq!(amounts(&cart), vec![(1, 1)]);

        assert_eq!(reload(&storage), cart);
        let reloaded = CartStore::load(Arc::clone(&storage), MockCatalogService::new()).unwrap();
        assert_eq!(reloaded.current_cart(), store.current_cart());
    }

    #[tokio::test]
    async fn test_add_existing_product_increments() {
        let storage = storage_with(vec![item(1, 1), item(2, 1)]);
        let mut catalog = MockCatalogService::new();
        catalog.expect_stock().returning(|id| Ok(stock(id.as_i32(), 3)));
        catalog.expect_product().never();

        let store = CartStore::load(Arc::clone(&storage), catalog).unwrap();
        let cart = store.add_product(ProductId::new(1)).await.unwrap();

        assert_eq!(amounts(&cart), vec![(1, 2), (2, 1)]);
        assert_eq!(reload(&storage), cart);
    }

    #[tokio::test]
    async fn test_add_up_to_exact_stock_succeeds() {
        let storage = storage_with(vec![item(1, 1)]);
        let mut catalog = MockCatalogService::new();
        catalog.expect_stock().returning(|_| Ok(stock(1, 2)));

        let store = CartStore::load(storage, catalog).unwrap();
        let cart = store.add_product(ProductId::new(1)).await.unwrap();

        assert_eq!(amounts(&cart), vec![(1, 2)]);
    }

    #[tokio::test]
    async fn test_add_existing_beyond_stock_fails() {
        let storage = storage_with(vec![item(1, 2)]);
        let before = storage.get(CART_KEY).unwrap();
        let mut catalog = MockCatalogService::new();
        catalog.expect_stock().returning(|_| Ok(stock(1, 2)));

        let store = CartStore::load(Arc::clone(&storage), catalog).unwrap();
        let err = store.add_product(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::OutOfStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
        assert_eq!(amounts(&store.current_cart()), vec![(1, 2)]);
        assert_eq!(storage.get(CART_KEY).unwrap(), before);
    }

    #[tokio::test]
    async fn test_add_new_product_without_stock_fails() {
        let storage = Arc::new(MemoryStorage::new());
        let mut catalog = MockCatalogService::new();
        catalog.expect_stock().returning(|_| Ok(stock(5, 0)));
        catalog.expect_product().never();

        let store = CartStore::load(Arc::clone(&storage), catalog).unwrap();
        let err = store.add_product(ProductId::new(5)).await.unwrap_err();

        assert_eq!(err.kind(), CartErrorKind::OutOfStock);
        assert!(store.current_cart().is_empty());
        assert_eq!(storage.get(CART_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_stock_lookup_failure() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_stock()
            .returning(|id| Err(CatalogError::NotFound(format!("stock/{id}"))));

        let store = CartStore::load(MemoryStorage::new(), catalog).unwrap();
        let err = store.add_product(ProductId::new(8)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::AdditionFailed {
                source: CartFault::Catalog(CatalogError::NotFound(_)),
                ..
            }
        ));
        assert_eq!(err.user_message(), "Erro na adição do produto");
        assert!(store.current_cart().is_empty());
    }

    #[tokio::test]
    async fn test_add_product_details_failure() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_stock().returning(|_| Ok(stock(4, 10)));
        catalog.expect_product().returning(|_| {
            Err(CatalogError::Status {
                status: 500,
                body: String::new(),
            })
        });

        let store = CartStore::load(MemoryStorage::new(), catalog).unwrap();
        let err = store.add_product(ProductId::new(4)).await.unwrap_err();

        assert_eq!(err.kind(), CartErrorKind::AdditionFailed);
        assert!(store.current_cart().is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_mismatched_product_record() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_stock().returning(|_| Ok(stock(4, 10)));
        catalog.expect_product().returning(|_| Ok(product(5)));

        let store = CartStore::load(MemoryStorage::new(), catalog).unwrap();
        let err = store.add_product(ProductId::new(4)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::AdditionFailed {
                source: CartFault::UnexpectedProduct(id),
                ..
            } if id == ProductId::new(5)
        ));
        assert!(store.current_cart().is_empty());
    }

    #[tokio::test]
    async fn test_add_storage_failure_leaves_memory_unchanged() {
        let storage = ReadOnlyStorage(MemoryStorage::new());
        let mut catalog = MockCatalogService::new();
        catalog.expect_stock().returning(|_| Ok(stock(1, 10)));
        catalog.expect_product().returning(|_| Ok(product(1)));

        let store = CartStore::load(storage, catalog).unwrap();
        let err = store.add_product(ProductId::new(1)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::AdditionFailed {
                source: CartFault::Storage(_),
                ..
            }
        ));
        assert!(store.current_cart().is_empty());
    }

    // =========================================================================
    // remove_product
    // =========================================================================

    #[tokio::test]
    async fn test_remove_present_product() {
        let storage = storage_with(vec![item(1, 2), item(2, 1), item(3, 4)]);
        let store = CartStore::load(Arc::clone(&storage), MockCatalogService::new()).unwrap();

        let cart = store.remove_product(ProductId::new(2)).await.unwrap();

        assert_eq!(amounts(&cart), vec![(1, 2), (3, 4)]);
        assert_eq!(reload(&storage), cart);
    }

    #[tokio::test]
    async fn test_remove_absent_product_fails() {
        let storage = storage_with(vec![item(1, 2)]);
        let before = storage.get(CART_KEY).unwrap();
        let store = CartStore::load(Arc::clone(&storage), MockCatalogService::new()).unwrap();

        let err = store.remove_product(ProductId::new(9)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::RemovalFailed {
                source: CartFault::NotInCart,
                ..
            }
        ));
        assert_eq!(amounts(&store.current_cart()), vec![(1, 2)]);
        assert_eq!(storage.get(CART_KEY).unwrap(), before);
    }

    #[tokio::test]
    async fn test_remove_storage_failure() {
        let storage = ReadOnlyStorage(MemoryStorage::with_entry(
            CART_KEY,
            encode_cart(&Cart::from_items(vec![item(1, 1)])).unwrap(),
        ));
        let store = CartStore::load(storage, MockCatalogService::new()).unwrap();

        let err = store.remove_product(ProductId::new(1)).await.unwrap_err();

        assert_eq!(err.kind(), CartErrorKind::RemovalFailed);
        assert_eq!(amounts(&store.current_cart()), vec![(1, 1)]);
    }

    // =========================================================================
    // update_product_amount
    // =========================================================================

    #[tokio::test]
    async fn test_update_below_one_is_a_silent_noop() {
        let storage = storage_with(vec![item(1, 2)]);
        let before = storage.get(CART_KEY).unwrap();
        let mut catalog = MockCatalogService::new();
        catalog.expect_stock().never();

        let store = CartStore::load(Arc::clone(&storage), catalog).unwrap();

        for amount in [0, -1, i32::MIN] {
            let cart = store
                .update_product_amount(UpdateProductAmount {
                    product_id: ProductId::new(1),
                    amount,
                })
                .await
                .unwrap();
            assert_eq!(amounts(&cart), vec![(1, 2)]);
        }

        // Absent products are ignored too when the amount is below one
        let cart = store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(42),
                amount: 0,
            })
            .await
            .unwrap();
        assert_eq!(amounts(&cart), vec![(1, 2)]);
        assert_eq!(storage.get(CART_KEY).unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_absent_product_fails() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_stock().never();
        let store = CartStore::load(storage_with(vec![item(1, 2)]), catalog).unwrap();

        let err = store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(7),
                amount: 3,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::UpdateFailed {
                source: CartFault::NotInCart,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_update_decrease_skips_stock_check() {
        let storage = storage_with(vec![item(1, 5), item(2, 1)]);
        let mut catalog = MockCatalogService::new();
        catalog.expect_stock().never();

        let store = CartStore::load(Arc::clone(&storage), catalog).unwrap();

        let cart = store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(1),
                amount: 2,
            })
            .await
            .unwrap();
        assert_eq!(amounts(&cart), vec![(1, 2), (2, 1)]);

        let cart = store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(1),
                amount: 2,
            })
            .await
            .unwrap();
        assert_eq!(amounts(&cart), vec![(1, 2), (2, 1)]);
        assert_eq!(reload(&storage), cart);
    }

    #[tokio::test]
    async fn test_update_increase_within_stock() {
        let storage = storage_with(vec![item(2, 3)]);
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_stock()
            .with(eq(ProductId::new(2)))
            .times(1)
            .returning(|_| Ok(stock(2, 10)));

        let store = CartStore::load(Arc::clone(&storage), catalog).unwrap();
        let cart = store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(2),
                amount: 5,
            })
            .await
            .unwrap();

        assert_eq!(amounts(&cart), vec![(2, 5)]);
        assert_eq!(reload(&storage), cart);
    }

    #[tokio::test]
    async fn test_update_increase_to_exact_stock() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_stock().returning(|_| Ok(stock(2, 5)));

        let store = CartStore::load(storage_with(vec![item(2, 3)]), catalog).unwrap();
        let cart = store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(2),
                amount: 5,
            })
            .await
            .unwrap();

        assert_eq!(amounts(&cart), vec![(2, 5)]);
    }

    #[tokio::test]
    async fn test_update_increase_beyond_stock_fails() {
        let storage = storage_with(vec![item(2, 3)]);
        let before = storage.get(CART_KEY).unwrap();
        let mut catalog = MockCatalogService::new();
        catalog.expect_stock().returning(|_| Ok(stock(2, 4)));

        let store = CartStore::load(Arc::clone(&storage), catalog).unwrap();
        let err = store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(2),
                amount: 5,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::OutOfStock {
                requested: 5,
                available: 4,
                ..
            }
        ));
        assert_eq!(amounts(&store.current_cart()), vec![(2, 3)]);
        assert_eq!(storage.get(CART_KEY).unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_stock_lookup_failure() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_stock()
            .returning(|_| Err(CatalogError::RateLimited(5)));

        let store = CartStore::load(storage_with(vec![item(2, 1)]), catalog).unwrap();
        let err = store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(2),
                amount: 2,
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), CartErrorKind::UpdateFailed);
        assert_eq!(amounts(&store.current_cart()), vec![(2, 1)]);
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    /// Catalog with fixed stock levels that yields before answering, so
    /// concurrent operations interleave at the await point.
    struct FixedStock(HashMap<ProductId, u32>);

    #[async_trait]
    impl CatalogService for FixedStock {
        async fn stock(&self, id: ProductId) -> Result<StockInfo, CatalogError> {
            tokio::task::yield_now().await;
            self.0
                .get(&id)
                .map(|amount| StockInfo { id, amount: *amount })
                .ok_or_else(|| CatalogError::NotFound(format!("stock/{id}")))
        }

        async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
            tokio::task::yield_now().await;
            Ok(product(id.as_i32()))
        }

        async fn products(&self) -> Result<Vec<Product>, CatalogError> {
            Ok(self.0.keys().map(|id| product(id.as_i32())).collect())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_do_not_lose_updates() {
        let storage = Arc::new(MemoryStorage::new());
        let catalog = FixedStock(HashMap::from([(ProductId::new(1), 100)]));
        let store = Arc::new(CartStore::load(Arc::clone(&storage), catalog).unwrap());

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add_product(ProductId::new(1)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(amounts(&store.current_cart()), vec![(1, 20)]);
        assert_eq!(reload(&storage), store.current_cart());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_respect_stock() {
        let catalog = FixedStock(HashMap::from([(ProductId::new(1), 3)]));
        let store = Arc::new(CartStore::load(MemoryStorage::new(), catalog).unwrap());

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add_product(ProductId::new(1)).await })
            })
            .collect();

        let mut out_of_stock = 0;
        for task in tasks {
            if let Err(err) = task.await.unwrap() {
                assert_eq!(err.kind(), CartErrorKind::OutOfStock);
                out_of_stock += 1;
            }
        }

        assert_eq!(out_of_stock, 7);
        assert_eq!(amounts(&store.current_cart()), vec![(1, 3)]);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    proptest! {
        #[test]
        fn prop_add_succeeds_iff_within_stock(current in 1u32..50, available in 0u32..50) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let storage = storage_with(vec![item(1, current)]);
            let catalog = FixedStock(HashMap::from([(ProductId::new(1), available)]));
            let store = CartStore::load(Arc::clone(&storage), catalog).unwrap();

            let result = runtime.block_on(store.add_product(ProductId::new(1)));

            if current < available {
                let cart = result.unwrap();
                prop_assert_eq!(amounts(&cart), vec![(1, current + 1)]);
                prop_assert_eq!(reload(&storage), cart);
            } else {
                prop_assert_eq!(result.unwrap_err().kind(), CartErrorKind::OutOfStock);
                prop_assert_eq!(amounts(&store.current_cart()), vec![(1, current)]);
            }
        }

        #[test]
        fn prop_update_increase_succeeds_iff_stock_covers(
            current in 1u32..20,
            target in 1i32..40,
            available in 0u32..40,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let catalog = FixedStock(HashMap::from([(ProductId::new(1), available)]));
            let store = CartStore::load(storage_with(vec![item(1, current)]), catalog).unwrap();

            let result = runtime.block_on(store.update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(1),
                amount: target,
            }));

            let target = target.unsigned_abs();
            if target <= current || target <= available {
                prop_assert_eq!(amounts(&result.unwrap()), vec![(1, target)]);
            } else {
                prop_assert_eq!(result.unwrap_err().kind(), CartErrorKind::OutOfStock);
                prop_assert_eq!(amounts(&store.current_cart()), vec![(1, current)]);
            }
        }
    }
}
