//! What the ingestion loop hands decoded events to.

use std::sync::Arc;

use async_trait::async_trait;
use cart_store::CartRepository;
use domain::{CartService, OrderConfirmedEvent};

/// Consumes decoded order-confirmed events.
///
/// Infallible by contract: the event is consumed whatever happens inside,
/// so implementations log their own failures.
#[async_trait]
pub trait OrderConfirmedHandler: Send + Sync {
    async fn handle(&self, event: OrderConfirmedEvent);
}

#[async_trait]
impl<R: CartRepository> OrderConfirmedHandler for CartService<R> {
    async fn handle(&self, event: OrderConfirmedEvent) {
        self.handle_order_confirmed(&event).await;
    }
}

#[async_trait]
impl<T: OrderConfirmedHandler + ?Sized> OrderConfirmedHandler for Arc<T> {
    async fn handle(&self, event: OrderConfirmedEvent) {
        (**self).handle(event).await;
    }
}
