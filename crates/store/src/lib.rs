//! Transactional persistence for the order fulfillment engine.
//!
//! Every write happens inside a [`UnitOfWork`] with an explicit
//! `commit`/`rollback` boundary. Two backends share the same contract:
//! [`InMemoryStore`] for tests and local runs, [`PostgresStore`] for
//! production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::LedgerQuery;
pub use store::{StockAdjustment, Store, UnitOfWork};
