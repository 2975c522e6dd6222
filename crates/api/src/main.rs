use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use altme_api::bootstrap::{ensure_admin, AdminSeed};
use altme_api::config::ServerConfig;
use altme_api::notifications::NotificationRouter;
use altme_api::payments::{PayoutGateway, StripeConfig, StripeGateway};
use altme_api::router::build_app_router;
use altme_api::state::AppState;
use altme_db::DbPool;
use altme_events::{EmailConfig, EmailDelivery, EventBus, EventPersistence};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let pool = prepare_database().await;

    if let Some(seed) = AdminSeed::from_env() {
        ensure_admin(&pool, &seed)
            .await
            .expect("Failed to seed admin account");
    }

    let event_bus = Arc::new(EventBus::default());
    let consumers = spawn_event_consumers(&pool, &event_bus);

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        payout_gateway: payout_gateway_from_env(),
    };
    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "AltMe API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // The router and its state are gone, so this is the last sender.
    // Closing the channel lets both consumers drain their backlog and stop.
    drop(event_bus);
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    for consumer in consumers {
        if tokio::time::timeout(drain, consumer).await.is_err() {
            tracing::warn!(
                timeout_secs = config.shutdown_timeout_secs,
                "Event consumer did not drain in time"
            );
        }
    }
    tracing::info!("Graceful shutdown complete");
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "altme_api=debug,altme_events=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Connect, verify and migrate. Any failure aborts startup.
async fn prepare_database() -> DbPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = altme_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    altme_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    altme_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready (connected, healthy, migrated)");
    pool
}

/// Start the audit log writer and the notification router.
fn spawn_event_consumers(pool: &DbPool, bus: &EventBus) -> [JoinHandle<()>; 2] {
    let email = EmailConfig::from_env()
        .map(|config| EmailDelivery::new(config).expect("Invalid SMTP configuration"));
    if email.is_none() {
        tracing::info!("SMTP_HOST not set, notifications are in-app only");
    }

    let audit = tokio::spawn(EventPersistence::run(pool.clone(), bus.subscribe()));
    let notifications =
        tokio::spawn(NotificationRouter::new(pool.clone(), email).run(bus.subscribe()));
    tracing::info!("Event consumers started");
    [audit, notifications]
}

fn payout_gateway_from_env() -> Option<Arc<dyn PayoutGateway>> {
    match StripeConfig::from_env() {
        Some(config) => {
            tracing::info!(currency = %config.currency, "Payouts transfer through Stripe");
            Some(Arc::new(StripeGateway::new(config)))
        }
        None => {
            tracing::info!("STRIPE_SECRET_KEY not set, payouts are completed manually");
            None
        }
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
