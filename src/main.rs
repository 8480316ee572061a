use actix::prelude::*;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use food_orders::actors::{GetOrdersByOwner, OrderLifecycleActor, PlaceOrder};
use food_orders::config::{AppConfig, StoreBackend};
use food_orders::domain::order::OrderItem;
use food_orders::lifecycle::OrderLifecycleManager;
use food_orders::metrics::{self, Metrics};
use food_orders::store::{
    CartService, InMemoryCartService, InMemoryOrderStore, OrderStore, ScyllaCartService,
    ScyllaOrderStore,
};

async fn connect_scylla(config: &AppConfig) -> anyhow::Result<Arc<Session>> {
    tracing::info!(node = %config.scylla_node, "Connecting to ScyllaDB...");
    let session: Session = SessionBuilder::new()
        .known_node(&config.scylla_node)
        .build()
        .await?;

    session
        .query_unpaged(
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                 {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                config.scylla_keyspace
            ),
            (),
        )
        .await?;

    session.use_keyspace(&config.scylla_keyspace, false).await?;

    Ok(Arc::new(session))
}

async fn build_collaborators(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn OrderStore>, Arc<dyn CartService>)> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory order store");
            Ok((
                Arc::new(InMemoryOrderStore::new()),
                Arc::new(InMemoryCartService::new()),
            ))
        }
        StoreBackend::Scylla => {
            let session = connect_scylla(config).await?;

            let store = ScyllaOrderStore::new(session.clone());
            store.ensure_schema().await?;
            let cart = ScyllaCartService::new(session);
            cart.ensure_schema().await?;

            Ok((Arc::new(store), Arc::new(cart)))
        }
    }
}

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,food_orders=debug"))
        )
        .init();

    tracing::info!("🚀 Starting food order lifecycle service");

    // === 1. Configuration ===
    let config = AppConfig::from_env()?;
    tracing::info!(
        backend = ?config.store_backend,
        cooking_after_secs = config.lifecycle.cooking_after.as_secs(),
        out_for_delivery_after_secs = config.lifecycle.out_for_delivery_after.as_secs(),
        delivered_after_secs = config.lifecycle.delivered_after.as_secs(),
        "Loaded configuration"
    );

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    actix::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_registry, metrics_port).await {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    // === 3. Store collaborators ===
    let (store, cart) = build_collaborators(&config).await?;

    // === 4. Lifecycle manager and its actor front-end ===
    let manager = OrderLifecycleManager::new(store, cart, config.lifecycle.clone(), Some(metrics));
    let order_actor = OrderLifecycleActor::new(manager.clone()).start();

    let mut events = manager.subscribe();
    actix::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(
                order_id = %event.order_id,
                event_type = event.event_type(),
                status = %event.status_after(),
                "📦 Lifecycle event"
            );
        }
    });

    // === 5. Demonstrate an order lifecycle ===
    let placed = order_actor
        .send(PlaceOrder {
            owner_id: "demo-user".to_string(),
            items: vec![
                OrderItem::new("f1", "Margherita", 10.0, 2),
                OrderItem::new("f2", "Garlic Bread", 4.5, 1),
            ],
            address: "221B Baker Street".to_string(),
            total_amount: 24.5,
        })
        .await??;

    tracing::info!(
        order_id = %placed.order_id(),
        eta = ?placed.order.estimated_delivery_at(config.lifecycle.delivered_after),
        "✅ Demo order placed"
    );

    let orders = order_actor
        .send(GetOrdersByOwner {
            owner_id: "demo-user".to_string(),
        })
        .await??;
    tracing::info!(count = orders.len(), "Orders on file for demo-user");

    // === 6. Run until interrupted ===
    tracing::info!("⏳ Waiting for Ctrl-C...");
    tokio::signal::ctrl_c().await?;

    let aborted = manager.shutdown().await;
    tracing::info!(aborted, "🎉 Shutdown complete");

    Ok(())
}
