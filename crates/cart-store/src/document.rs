//! Stored shape of a user's cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{ProductId, UserId};

/// One product line in a cart.
///
/// Only `product_id` and `quantity` take part in cart logic. Anything else
/// the client sends (name, price, image URL, ...) is kept in `attributes`
/// and written back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl CartLineItem {
    /// Creates a line item with no extra attributes.
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            attributes: serde_json::Map::new(),
        }
    }

    /// Adds an opaque attribute that is carried through unmodified.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// The cart aggregate root, one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDocument {
    pub user_id: UserId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<CartLineItem>,
    pub last_updated_at: DateTime<Utc>,
}

impl CartDocument {
    /// Creates an empty cart for a user, stamped with the current time.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            last_updated_at: Utc::now(),
        }
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the line for a product, if present.
    pub fn item(&self, product_id: &ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    /// Sum of quantities across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items
            .iter()
            .fold(0i64, |acc, i| acc.saturating_add(i.quantity))
    }

    /// Stamps `last_updated_at` for a write.
    ///
    /// Never moves the stamp backwards, so a wall clock stepping back between
    /// two saves still leaves the document's history non-decreasing.
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.last_updated_at {
            self.last_updated_at = now;
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<CartLineItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CartLineItem>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn persisted_shape_uses_camel_case() {
        let mut doc = CartDocument::empty(UserId::new("u1"));
        doc.items.push(CartLineItem::new("p1", 2));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["items"][0]["productId"], "p1");
        assert_eq!(json["items"][0]["quantity"], 2);
        assert!(json["lastUpdatedAt"].is_string());
    }

    #[test]
    fn opaque_fields_pass_through() {
        let raw = serde_json::json!({
            "productId": "p1",
            "quantity": 1,
            "name": "Widget",
            "price": 9.99
        });

        let item: CartLineItem = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(item.attributes["name"], "Widget");
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }

    #[test]
    fn null_items_read_as_empty() {
        let raw = serde_json::json!({
            "userId": "u1",
            "items": null,
            "lastUpdatedAt": "2024-01-01T00:00:00Z"
        });

        let doc: CartDocument = serde_json::from_value(raw).unwrap();
        assert!(doc.items.is_empty());
    }

    #[test]
    fn missing_items_read_as_empty() {
        let raw = serde_json::json!({
            "userId": "u1",
            "lastUpdatedAt": "2024-01-01T00:00:00Z"
        });

        let doc: CartDocument = serde_json::from_value(raw).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut doc = CartDocument::empty(UserId::new("u1"));
        let future = Utc::now() + Duration::hours(1);
        doc.last_updated_at = future;

        doc.touch();
        assert_eq!(doc.last_updated_at, future);
    }

    #[test]
    fn touch_advances_stale_stamp() {
        let mut doc = CartDocument::empty(UserId::new("u1"));
        let past = Utc::now() - Duration::hours(1);
        doc.last_updated_at = past;

        doc.touch();
        assert!(doc.last_updated_at > past);
    }

    #[test]
    fn item_lookup_and_total() {
        let mut doc = CartDocument::empty(UserId::new("u1"));
        doc.items.push(CartLineItem::new("p1", 2));
        doc.items.push(CartLineItem::new("p2", 3));

        assert_eq!(doc.item(&ProductId::new("p2")).unwrap().quantity, 3);
        assert!(doc.item(&ProductId::new("p3")).is_none());
        assert_eq!(doc.total_quantity(), 5);
    }

    #[test]
    fn total_quantity_saturates() {
        let mut doc = CartDocument::empty(UserId::new("u1"));
        doc.items.push(CartLineItem::new("p1", i64::MAX));
        doc.items.push(CartLineItem::new("p2", 1));

        assert_eq!(doc.total_quantity(), i64::MAX);
    }
}
