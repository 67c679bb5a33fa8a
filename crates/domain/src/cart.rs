//! Cart snapshot read at checkout.

use common::{BookId, UserId};
use serde::{Deserialize, Serialize};

/// One line of a customer's cart. The cart itself belongs to an external
/// collaborator; checkout reads a snapshot and clears it on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub user_id: UserId,
    pub book_id: BookId,
    pub quantity: u32,
}
