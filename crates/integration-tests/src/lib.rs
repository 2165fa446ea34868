//! Integration tests for the RocketShoes cart.
//!
//! The tests run the real [`CatalogClient`](rocketshoes_cart::CatalogClient)
//! against [`FakeCatalog`], an in-process HTTP server bound to a random port
//! on `127.0.0.1`, and persist carts with
//! [`FileStorage`](rocketshoes_cart::FileStorage) in temp directories.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rocketshoes-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `catalog_client` - HTTP status handling, fallbacks, caching, auth
//! - `cart_flow` - Cart operations end to end, including reloads

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rocketshoes_cart::{CatalogConfig, ConfigError};
use rocketshoes_core::{Product, ProductId, StockInfo};
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// =============================================================================
// Fixtures
// =============================================================================

/// The catalog the storefront ships with in development.
#[must_use]
pub fn sneakers() -> Vec<(Product, u32)> {
    [
        (1, "Tênis de Caminhada Leve Confortável", 17990, 3),
        (2, "Tênis VR Caminhada Confortável Detalhes Couro Masculino", 13990, 5),
        (3, "Tênis Adidas Duramo Lite 2.0", 21990, 2),
        (4, "Tênis de Caminhada Leve Confortável Preto", 17990, 1),
        (5, "Tênis Nike Revolution 5", 19990, 0),
    ]
    .into_iter()
    .map(|(id, title, cents, stock)| {
        let product = Product::new(
            ProductId::new(id),
            title,
            Decimal::new(cents, 2),
            format!("https://rocketseat-cdn.s3-sa-east-1.amazonaws.com/modulo-redux/tenis{id}.jpg"),
        );
        (product, stock)
    })
    .collect()
}

// =============================================================================
// Fake catalog server
// =============================================================================

/// Canned response served instead of the real handler for one path.
#[derive(Debug, Clone)]
pub struct Fault {
    status: u16,
    body: String,
    retry_after: Option<u64>,
}

impl Fault {
    /// Respond with `status` and a plain-text body.
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Respond with 429 and a `Retry-After` header.
    #[must_use]
    pub const fn rate_limited(retry_after: u64) -> Self {
        Self {
            status: 429,
            body: String::new(),
            retry_after: Some(retry_after),
        }
    }

    /// Respond with 200 and a body that is not the expected JSON.
    #[must_use]
    pub fn malformed(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }
}

impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, self.body).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, secs.into());
        }
        response
    }
}

#[derive(Default)]
struct CatalogState {
    products: Mutex<Vec<Product>>,
    stock: Mutex<HashMap<ProductId, u32>>,
    faults: Mutex<HashMap<String, Fault>>,
    hits: Mutex<HashMap<String, usize>>,
    token: Mutex<Option<String>>,
    product_endpoint_disabled: AtomicBool,
}

impl CatalogState {
    fn product(&self, id: ProductId) -> Option<Product> {
        self.products
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|product| product.id == id)
            .cloned()
    }
}

/// In-process catalog API serving `/stock/{id}`, `/products/{id}` and
/// `/products`.
///
/// The server stops when the value is dropped.
pub struct FakeCatalog {
    state: Arc<CatalogState>,
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl FakeCatalog {
    /// Start an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(CatalogState::default());

        let app = Router::new()
            .route("/stock/{id}", get(stock_handler))
            .route("/products/{id}", get(product_handler))
            .route("/products", get(products_handler))
            .layer(middleware::from_fn_with_state(state.clone(), gate))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            state,
            addr,
            server,
        })
    }

    /// Start a catalog seeded with [`sneakers`].
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn with_sneakers() -> std::io::Result<Self> {
        let catalog = Self::start().await?;
        for (product, stock) in sneakers() {
            catalog.insert(product, stock);
        }
        Ok(catalog)
    }

    /// Base URL of the server, ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Client configuration pointing at this server.
    ///
    /// # Errors
    ///
    /// Never fails for a bound address; the `Result` mirrors
    /// [`CatalogConfig::new`].
    pub fn config(&self) -> Result<CatalogConfig, ConfigError> {
        CatalogConfig::new(&self.base_url())
    }

    /// Add or replace a product and its stock.
    pub fn insert(&self, product: Product, stock: u32) {
        let id = product.id;
        {
            let mut products = self
                .state
                .products
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            products.retain(|existing| existing.id != id);
            products.push(product);
        }
        self.set_stock(id, stock);
    }

    /// Change the stock of a product.
    pub fn set_stock(&self, id: ProductId, amount: u32) {
        self.state
            .stock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, amount);
    }

    /// Make `/products/{id}` answer 404 for every id.
    pub fn disable_product_endpoint(&self) {
        self.state
            .product_endpoint_disabled
            .store(true, Ordering::SeqCst);
    }

    /// Serve `fault` for every request to `path` (e.g. `/stock/1`).
    pub fn fail(&self, path: &str, fault: Fault) {
        self.state
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), fault);
    }

    /// Stop serving the fault for `path`.
    pub fn heal(&self, path: &str) {
        self.state
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
    }

    /// Reject requests without `Authorization: Bearer {token}`.
    pub fn require_token(&self, token: &str) {
        *self
            .state
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    }

    /// Number of requests received for `path`.
    #[must_use]
    pub fn hits(&self, path: &str) -> usize {
        self.state
            .hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for FakeCatalog {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Count the request, then apply auth and faults before routing.
async fn gate(State(state): State<Arc<CatalogState>>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    *state
        .hits
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(path.clone())
        .or_default() += 1;

    let token = state
        .token
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if let Some(token) = token
        && !is_authorized(request.headers(), &token)
    {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let fault = state
        .faults
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&path)
        .cloned();
    if let Some(fault) = fault {
        return fault.into_response();
    }

    next.run(request).await
}

fn is_authorized(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|presented| presented == token)
}

async fn stock_handler(State(state): State<Arc<CatalogState>>, Path(id): Path<i32>) -> Response {
    let id = ProductId::new(id);
    let amount = state
        .stock
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .copied();

    match amount {
        Some(amount) => Json(StockInfo { id, amount }).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn product_handler(State(state): State<Arc<CatalogState>>, Path(id): Path<i32>) -> Response {
    if state.product_endpoint_disabled.load(Ordering::SeqCst) {
        return StatusCode::NOT_FOUND.into_response();
    }

    match state.product(ProductId::new(id)) {
        Some(product) => Json(product).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn products_handler(State(state): State<Arc<CatalogState>>) -> Json<Vec<Product>> {
    let products = state
        .products
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    Json(products)
}
