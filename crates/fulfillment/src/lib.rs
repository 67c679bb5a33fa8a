//! Order fulfillment and inventory consistency.
//!
//! Checkout turns a cart into an order in two units of work with the payment
//! call between them:
//! 1. Validate the cart against current stock
//! 2. Reserve: create the order and take stock atomically
//! 3. Charge the payment gateway, bounded by a timeout
//! 4. Finalize: mark the order `Processing`, or cancel it and restore stock
//!
//! Every stock change goes through [`StockMutator`], which writes exactly one
//! ledger entry per change. Cancellations restore stock through
//! [`CompensationEngine`].

pub mod checkout;
pub mod compensation;
pub mod error;
pub mod inventory;
pub mod payment;
pub mod state;
pub mod status;
pub mod stock;

pub use checkout::{CheckoutConfig, CheckoutOrchestrator, CheckoutRequest};
pub use compensation::{CompensationEngine, Restoration};
pub use error::{FulfillmentError, Result};
pub use inventory::{InventoryService, ManualAdjustment};
pub use payment::{
    InMemoryPaymentGateway, MockPaymentGateway, PaymentGateway, PaymentOutcome, PaymentRequest,
};
pub use state::CheckoutState;
pub use status::OrderStatusService;
pub use stock::{StockChange, StockMutator};
