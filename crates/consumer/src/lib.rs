//! Event ingestion for the cart service.
//!
//! Turns order-confirmed messages from the bus into cart clears:
//! - [`DeliverySource`] abstracts the transport ([`AmqpSource`], [`ChannelSource`])
//! - [`decode_order_confirmed`] parses the wire body, malformed ones are dropped
//! - [`consumer_span`] joins the handler to the publisher's W3C trace
//! - [`IngestionLoop`] runs as a managed background task behind an [`IngestionHandle`]

pub mod amqp;
pub mod delivery;
pub mod error;
pub mod handler;
pub mod ingestion;
pub mod source;
pub mod trace;

pub use amqp::{AmqpConnection, AmqpSource, Topology};
pub use delivery::{Delivery, decode_order_confirmed};
pub use error::{ConsumerError, Result};
pub use handler::OrderConfirmedHandler;
pub use ingestion::{IngestionHandle, IngestionLoop, IngestionStats};
pub use source::{ChannelSource, DeliverySource};
pub use trace::{HeaderExtractor, consumer_span, extract_context};
