//! HTTP API server and process wiring for the cart service.
//!
//! Serves cart reads and add-item requests over REST, and runs the
//! order-confirmed consumer that empties carts, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use cart_store::CartRepository;
use consumer::{AmqpConnection, IngestionHandle, IngestionLoop, Topology};
use domain::CartService;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::carts::AppState;

/// Consumer tag the service registers on its queue.
pub const CONSUMER_TAG: &str = "cart-service";

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R: CartRepository + 'static>(
    state: Arc<AppState<R>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/carts/{user_id}", get(routes::carts::get::<R>))
        .route("/carts/{user_id}/items", post(routes::carts::add_item::<R>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around a cart repository.
///
/// The returned service is the one the HTTP handlers use; hand the same
/// `Arc` to the consumer so both paths share one repository.
pub fn create_state<R: CartRepository + 'static>(repository: R) -> Arc<AppState<R>> {
    Arc::new(AppState {
        cart_service: Arc::new(CartService::new(repository)),
    })
}

/// Connects to the broker, declares the order-confirmed topology and starts
/// the ingestion loop on a background task.
///
/// The connection is returned so the caller can close it after the loop has
/// been shut down.
pub async fn start_order_confirmed_consumer<R: CartRepository + 'static>(
    amqp_url: &str,
    topology: &Topology,
    cart_service: Arc<CartService<R>>,
) -> consumer::Result<(AmqpConnection, IngestionHandle)> {
    let connection = AmqpConnection::connect(amqp_url).await?;
    connection.declare_topology(topology).await?;
    let source = connection.consume(topology, CONSUMER_TAG).await?;

    let handle = IngestionLoop::new(source, cart_service, topology.exchange.as_str()).spawn();
    tracing::info!(
        exchange = %topology.exchange,
        queue = %topology.queue,
        "order-confirmed consumer started"
    );

    Ok((connection, handle))
}
