//! RabbitMQ binding: topology declaration and an auto-ack consumer.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};

use crate::{Delivery, DeliverySource, Result};

/// Fanout exchange the order service publishes confirmations to.
pub const ORDER_CONFIRMED_EXCHANGE: &str = "order_confirmed_exchange";

/// This service's durable queue bound to [`ORDER_CONFIRMED_EXCHANGE`].
pub const ORDER_CONFIRMED_QUEUE: &str = "cart_service_order_confirmed_queue";

/// Exchange and queue names for the order-confirmed subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub exchange: String,
    pub queue: String,
}

impl Topology {
    pub fn new(exchange: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            queue: queue.into(),
        }
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(ORDER_CONFIRMED_EXCHANGE, ORDER_CONFIRMED_QUEUE)
    }
}

/// An open broker connection with one channel.
pub struct AmqpConnection {
    connection: Connection,
    channel: Channel,
}

impl AmqpConnection {
    /// Connects to the broker and opens a channel.
    #[tracing::instrument(skip(url))]
    pub async fn connect(url: &str) -> Result<Self> {
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        tracing::info!("connected to AMQP broker");
        Ok(Self {
            connection,
            channel,
        })
    }

    /// Declares the fanout exchange and the durable queue, and binds them.
    ///
    /// Safe to call on every startup; redeclaring with the same arguments is
    /// a no-op on the broker.
    #[tracing::instrument(skip(self))]
    pub async fn declare_topology(&self, topology: &Topology) -> Result<()> {
        self.channel
            .exchange_declare(
                &topology.exchange,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        self.channel
            .queue_declare(
                &topology.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        // Fanout ignores the routing key.
        self.channel
            .queue_bind(
                &topology.queue,
                &topology.exchange,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::info!("declared order-confirmed topology");
        Ok(())
    }

    /// Starts consuming the topology's queue.
    ///
    /// Deliveries are acknowledged by the broker as soon as they are sent, so
    /// a message dequeued but not yet handled is lost if the process dies.
    #[tracing::instrument(skip(self))]
    pub async fn consume(&self, topology: &Topology, consumer_tag: &str) -> Result<AmqpSource> {
        let consumer = self
            .channel
            .basic_consume(
                &topology.queue,
                consumer_tag,
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        tracing::info!("listening for order-confirmed events");
        Ok(AmqpSource { consumer })
    }

    /// Closes the channel and the connection.
    pub async fn close(&self) -> Result<()> {
        self.channel.close(200, "shutdown").await?;
        self.connection.close(200, "shutdown").await?;
        Ok(())
    }
}

/// [`DeliverySource`] over a lapin consumer.
pub struct AmqpSource {
    consumer: lapin::Consumer,
}

#[async_trait]
impl DeliverySource for AmqpSource {
    async fn next_delivery(&mut self) -> Option<Result<Delivery>> {
        let next = self.consumer.next().await?;
        Some(next.map(into_delivery).map_err(Into::into))
    }
}

fn into_delivery(delivery: lapin::message::Delivery) -> Delivery {
    let headers = delivery
        .properties
        .headers()
        .as_ref()
        .map(field_table_to_headers)
        .unwrap_or_default();

    Delivery {
        body: delivery.data,
        headers,
    }
}

/// Keeps string-valued headers only; trace propagation never uses others.
fn field_table_to_headers(table: &FieldTable) -> HashMap<String, String> {
    table
        .inner()
        .iter()
        .filter_map(|(key, value)| {
            header_value(value).map(|value| (key.as_str().to_string(), value))
        })
        .collect()
}

fn header_value(value: &AMQPValue) -> Option<String> {
    match value {
        AMQPValue::LongString(s) => Some(String::from_utf8_lossy(s.as_bytes()).into_owned()),
        AMQPValue::ShortString(s) => Some(s.as_str().to_string()),
        _ => None,
    }
}
