//! Identifier types shared by every crate in the cart service.

mod types;

pub use types::{ProductId, UserId};
