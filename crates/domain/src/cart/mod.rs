//! Cart engine and the events it reacts to.

mod events;
mod service;

pub use events::OrderConfirmedEvent;
pub use service::CartService;
