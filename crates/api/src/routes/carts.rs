//! Cart read and add-item endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use cart_store::CartRepository;
use domain::{CartDocument, CartLineItem, CartService, UserId};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<R: CartRepository> {
    pub cart_service: Arc<CartService<R>>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub item: CartLineItem,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub user_id: UserId,
    pub items: Vec<CartLineItem>,
}

impl From<CartDocument> for CartResponse {
    fn from(cart: CartDocument) -> Self {
        Self {
            user_id: cart.user_id,
            items: cart.items,
        }
    }
}

// -- Handlers --

/// GET /carts/:user_id: load a user's cart, creating an empty one on first
/// access.
#[tracing::instrument(skip(state))]
pub async fn get<R: CartRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(user_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = parse_user_id(user_id)?;
    let cart = state.cart_service.get_cart(&user_id).await?;
    Ok(Json(cart.into()))
}

/// POST /carts/:user_id/items: add an item, merging quantities with an
/// existing line for the same product.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<R: CartRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(user_id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = parse_user_id(user_id)?;
    let cart = state.cart_service.add_item(&user_id, req.item).await?;
    Ok(Json(cart.into()))
}

fn parse_user_id(raw: String) -> Result<UserId, ApiError> {
    let user_id = UserId::from(raw);
    if user_id.is_blank() {
        return Err(ApiError::BadRequest("user_id must not be blank".to_string()));
    }
    Ok(user_id)
}
