//! Cart service: the only place cart state transitions happen.

use cart_store::{CartDocument, CartLineItem, CartRepository};
use common::UserId;

use super::OrderConfirmedEvent;
use crate::error::DomainError;

/// Service for managing carts.
///
/// Every mutation is an independent fetch-modify-save against the
/// repository. Nothing serializes a concurrent `add_item` and a clear for the
/// same user: if the add fetches before the clear and saves after it, the
/// cleared items come back. Callers that need more must add a version check
/// on save.
pub struct CartService<R: CartRepository> {
    repository: R,
}

impl<R: CartRepository> CartService<R> {
    /// Creates a new cart service over the given repository.
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Loads the cart for a user, creating an empty one if none exists.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: &UserId) -> Result<CartDocument, DomainError> {
        Ok(self.repository.fetch(user_id).await?)
    }

    /// Adds an item to a user's cart and returns the updated cart.
    ///
    /// An existing line for the same product absorbs the quantity; otherwise
    /// the item is appended. Quantities are not validated, so zero and
    /// negative values are merged as-is.
    #[tracing::instrument(
        skip(self, item),
        fields(user_id = %user_id, product_id = %item.product_id, quantity = item.quantity)
    )]
    pub async fn add_item(
        &self,
        user_id: &UserId,
        item: CartLineItem,
    ) -> Result<CartDocument, DomainError> {
        let mut cart = self.repository.fetch(user_id).await?;

        merge_line_item(&mut cart.items, item);

        self.repository.save(&mut cart).await?;
        metrics::counter!("cart_items_added_total").increment(1);
        tracing::debug!(
            lines = cart.items.len(),
            total_quantity = cart.total_quantity(),
            "item added to cart"
        );

        Ok(cart)
    }

    /// Removes every item from a user's cart.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear_cart(&self, user_id: &UserId) -> Result<(), DomainError> {
        self.repository.clear(user_id).await?;
        Ok(())
    }

    /// Empties the cart of the user whose order was confirmed.
    ///
    /// Failures are logged and swallowed: the event counts as consumed
    /// whatever the store answered, and nothing retries it.
    #[tracing::instrument(skip(self, event), fields(user_id = %event.user_id, order_id = %event.order_id))]
    pub async fn handle_order_confirmed(&self, event: &OrderConfirmedEvent) {
        tracing::info!("clearing cart for confirmed order");

        match self.clear_cart(&event.user_id).await {
            Ok(()) => {
                metrics::counter!("cart_clears_total").increment(1);
                tracing::info!("cart cleared");
            }
            Err(e) => {
                metrics::counter!("cart_clear_failures_total").increment(1);
                tracing::error!(error = %e, "failed to clear cart");
            }
        }
    }
}

/// First line with the same product wins; scan order is insertion order.
fn merge_line_item(items: &mut Vec<CartLineItem>, item: CartLineItem) {
    match items.iter_mut().find(|i| i.product_id == item.product_id) {
        Some(existing) => {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        }
        None => items.push(item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_store::InMemoryCartRepository;
    use common::ProductId;

    fn create_service() -> CartService<InMemoryCartRepository> {
        CartService::new(InMemoryCartRepository::new())
    }

    #[test]
    fn merge_appends_new_product() {
        let mut items = vec![CartLineItem::new("p1", 1)];
        merge_line_item(&mut items, CartLineItem::new("p2", 4));

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].product_id, ProductId::new("p2"));
        assert_eq!(items[1].quantity, 4);
    }

    #[test]
    fn merge_accumulates_existing_product() {
        let mut items = vec![CartLineItem::new("p1", 1), CartLineItem::new("p2", 1)];
        merge_line_item(&mut items, CartLineItem::new("p1", 3));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 4);
    }

    #[test]
    fn merge_keeps_existing_attributes() {
        let mut items =
            vec![CartLineItem::new("p1", 1).with_attribute("name", serde_json::json!("Widget"))];
        merge_line_item(
            &mut items,
            CartLineItem::new("p1", 1).with_attribute("name", serde_json::json!("Renamed")),
        );

        assert_eq!(items[0].attributes["name"], "Widget");
    }

    #[test]
    fn merge_accepts_negative_quantity() {
        let mut items = vec![CartLineItem::new("p1", 2)];
        merge_line_item(&mut items, CartLineItem::new("p1", -5));

        assert_eq!(items[0].quantity, -3);
    }

    #[test]
    fn merge_saturates_instead_of_overflowing() {
        let mut items = vec![CartLineItem::new("p1", i64::MAX)];
        merge_line_item(&mut items, CartLineItem::new("p1", 1));

        assert_eq!(items[0].quantity, i64::MAX);
    }

    #[tokio::test]
    async fn test_get_cart_creates_empty() {
        let service = create_service();
        let user = UserId::new("u1");

        let cart = service.get_cart(&user).await.unwrap();

        assert_eq!(cart.user_id, user);
        assert!(cart.items.is_empty());
        assert!(service.repository().contains(&user).await);
    }

    #[tokio::test]
    async fn test_add_item_returns_mutated_cart() {
        let service = create_service();
        let user = UserId::new("u1");

        let cart = service
            .add_item(&user, CartLineItem::new("p1", 2))
            .await
            .unwrap();

        assert_eq!(cart.items, vec![CartLineItem::new("p1", 2)]);
        let stored = service.repository().peek(&user).await.unwrap();
        assert_eq!(stored, cart);
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let service = create_service();
        let user = UserId::new("u1");
        service
            .add_item(&user, CartLineItem::new("p1", 1))
            .await
            .unwrap();

        service.clear_cart(&user).await.unwrap();

        assert!(!service.repository().contains(&user).await);
        assert!(service.get_cart(&user).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_clear_cart_propagates_store_error() {
        let service = create_service();
        service.repository().set_unavailable(true);

        let result = service.clear_cart(&UserId::new("u1")).await;

        assert!(matches!(result, Err(DomainError::Store(_))));
    }

    #[tokio::test]
    async fn test_handle_order_confirmed_swallows_failure() {
        let service = create_service();
        let user = UserId::new("u1");
        service
            .add_item(&user, CartLineItem::new("p1", 1))
            .await
            .unwrap();
        service.repository().set_writes_failing(true);

        service
            .handle_order_confirmed(&OrderConfirmedEvent::new("o1", "u1"))
            .await;

        // Nothing removed, nothing raised.
        assert_eq!(service.repository().peek(&user).await.unwrap().items.len(), 1);
    }
}
