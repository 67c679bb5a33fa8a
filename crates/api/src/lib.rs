//! HTTP API server for the bookstore order fulfillment engine.
//!
//! Provides REST endpoints for checkout, order status changes and staff
//! inventory work, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod identity;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::{Book, Money};
use fulfillment::{CheckoutOrchestrator, InventoryService, OrderStatusService, PaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart/items", put(routes::cart::set_item::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/admin/orders", get(routes::admin::list::<S>))
        .route("/admin/orders/{id}", get(routes::admin::get::<S>))
        .route(
            "/admin/orders/{id}/status",
            put(routes::admin::update_status::<S>),
        )
        .route("/admin/orders/{id}/cancel", post(routes::admin::cancel::<S>))
        .route("/inventory/logs", get(routes::inventory::logs::<S>))
        .route("/inventory/low-stock", get(routes::inventory::low_stock::<S>))
        .route("/inventory/{id}", put(routes::inventory::adjust::<S>))
        .route("/inventory/{id}/logs", get(routes::inventory::book_logs::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the fulfillment services over one store and payment gateway.
pub fn create_default_state<S: Store + Clone + 'static>(
    store: S,
    gateway: Arc<dyn PaymentGateway>,
    config: &Config,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        checkout: CheckoutOrchestrator::new(store.clone(), gateway, config.checkout_config()),
        orders: OrderStatusService::new(store.clone()),
        inventory: InventoryService::new(store.clone()),
        low_stock_threshold: config.low_stock_threshold,
        store,
    })
}

/// Inserts a handful of demo books for local runs.
pub async fn seed_demo_catalog<S: Store>(store: &S) -> store::Result<Vec<Book>> {
    let books = vec![
        Book::new("Dune", Money::from_cents(1899), 12),
        Book::new("The Left Hand of Darkness", Money::from_cents(1550), 4),
        Book::new("Emma", Money::from_cents(999), 25),
        Book::new("Piranesi", Money::from_cents(1700), 0),
    ];
    for book in &books {
        store.upsert_book(book.clone()).await?;
    }
    Ok(books)
}
