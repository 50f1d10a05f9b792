//! Events consumed by the cart engine.

use common::UserId;
use serde::{Deserialize, Serialize};

/// Published by the order service once an order has been confirmed.
///
/// `order_id` is only carried for logs and traces; it is not used to
/// deduplicate deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmedEvent {
    pub order_id: String,
    pub user_id: UserId,
}

impl OrderConfirmedEvent {
    pub fn new(order_id: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        Self {
            order_id: order_id.into(),
            user_id: user_id.into(),
        }
    }
}
