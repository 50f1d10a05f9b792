//! Transport-neutral message and its decoding.

use std::collections::HashMap;

use domain::OrderConfirmedEvent;

use crate::Result;

/// A message as handed over by a [`DeliverySource`](crate::DeliverySource).
///
/// Headers are flattened to strings; non-string header values are dropped
/// by the transport before they get here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl Delivery {
    /// Creates a delivery with the given body and no headers.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// Creates a delivery whose body is the JSON encoding of an event.
    pub fn from_event(event: &OrderConfirmedEvent) -> Result<Self> {
        Ok(Self::new(serde_json::to_vec(event)?))
    }

    /// Adds a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Decodes a `{"order_id": ..., "user_id": ...}` body.
pub fn decode_order_confirmed(body: &[u8]) -> Result<OrderConfirmedEvent> {
    Ok(serde_json::from_slice(body)?)
}
