//! API server entry point.

use api::config::Config;
use cart_store::{CartRepository, InMemoryCartRepository, PostgresCartRepository};
use metrics_exporter_prometheus::PrometheusHandle;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Load .env before anything reads the environment
    let dotenv = dotenvy::dotenv();
    let config = Config::from_env();

    // 2. Initialize tracing, with OpenTelemetry span contexts so consumed
    //    events join the publisher's trace
    let tracer_provider = SdkTracerProvider::builder()
        .with_resource(
            Resource::builder()
                .with_service_name(config.otel_service_name.clone())
                .build(),
        )
        .build();
    let tracer = tracer_provider.tracer(config.otel_service_name.clone());

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded .env file"),
        Err(e) if e.not_found() => tracing::debug!("no .env file found"),
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env file"),
    }

    // 3. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 4. Open the cart store
    match config.database_url.clone() {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(&url)
                .await
                .expect("failed to connect to database");
            let repository = PostgresCartRepository::new(pool);
            repository
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL cart store");
            run(config, repository, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, carts are kept in memory only");
            run(config, InMemoryCartRepository::new(), metrics_handle).await;
        }
    }

    if let Err(e) = tracer_provider.shutdown() {
        tracing::warn!(error = %e, "error shutting down tracer provider");
    }
}

async fn run<R: CartRepository + 'static>(
    config: Config,
    repository: R,
    metrics_handle: PrometheusHandle,
) {
    // 5. Create application state and start the order-confirmed consumer
    let state = api::create_state(repository);

    let consumer = match config.amqp_url.as_deref() {
        Some(url) => Some(
            api::start_order_confirmed_consumer(
                url,
                &config.topology,
                state.cart_service.clone(),
            )
            .await
            .expect("failed to start order-confirmed consumer"),
        ),
        None => {
            tracing::warn!("AMQP_URL not set, order-confirmed consumer disabled");
            None
        }
    };

    // 6. Build the application
    let app = api::create_app(state, metrics_handle);

    // 7. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 8. Drain the consumer: finish the in-flight event, then disconnect
    if let Some((connection, handle)) = consumer {
        match handle.shutdown().await {
            Ok(stats) => tracing::info!(
                received = stats.received,
                handled = stats.handled,
                decode_failures = stats.decode_failures,
                "order-confirmed consumer stopped"
            ),
            Err(e) => tracing::error!(error = %e, "order-confirmed consumer task failed"),
        }
        if let Err(e) = connection.close().await {
            tracing::warn!(error = %e, "error closing AMQP connection");
        }
    }

    tracing::info!("server shut down gracefully");
}
