//! Orders, their items, and the status machine.

mod aggregate;
mod state;
mod value_objects;

pub use aggregate::{CancelledBy, Order, OrderDetails, OrderLine};
pub use state::OrderStatus;
pub use value_objects::{OrderItem, OrderNumber, ShippingInfo};
