//! Shared application state.

use fulfillment::{CheckoutOrchestrator, InventoryService, OrderStatusService};
use store::Store;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub store: S,
    pub checkout: CheckoutOrchestrator<S>,
    pub orders: OrderStatusService<S>,
    pub inventory: InventoryService<S>,
    /// Used by `/inventory/low-stock` when no threshold is given.
    pub low_stock_threshold: u32,
}
