//! Cart aggregate engine.
//!
//! This crate holds the state-transition rules for a user's cart:
//! - [`CartService`] for fetch-or-create, add-item merging and clearing
//! - [`OrderConfirmedEvent`], the inbound fact that empties a cart
//! - [`DomainError`] propagated to the request boundary

pub mod cart;
pub mod error;

pub use cart::{CartService, OrderConfirmedEvent};
pub use cart_store::{CartDocument, CartLineItem};
pub use common::{ProductId, UserId};
pub use error::DomainError;
