//! Cart document model and the persistence contract the cart engine runs on.
//!
//! - [`CartDocument`] / [`CartLineItem`]: the per-user aggregate as stored
//! - [`CartRepository`]: fetch-or-create, save, clear
//! - [`InMemoryCartRepository`] and [`PostgresCartRepository`] implementations

pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use common::{ProductId, UserId};
pub use document::{CartDocument, CartLineItem};
pub use error::{CartStoreError, Result};
pub use memory::InMemoryCartRepository;
pub use postgres::PostgresCartRepository;
pub use repository::CartRepository;
