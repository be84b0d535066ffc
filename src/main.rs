use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use travel_backend::api::{self, AppState};
use travel_backend::config::AppConfig;
use travel_backend::database::booking_repository::BookingRepository;
use travel_backend::database::init_pool_from_config;
use travel_backend::database::memory::InMemoryStore;
use travel_backend::database::payment_repository::PaymentRepository;
use travel_backend::database::repository::{BookingLedger, PaymentRecordStore};
use travel_backend::health::HealthChecker;
use travel_backend::logging::init_tracing;
use travel_backend::middleware::auth::JwtAuth;
use travel_backend::payments::{ChapaConfig, ChapaGateway, PaymentGateway};
use travel_backend::services::{
    BookingService, LogMailer, OrchestratorConfig, PaymentOrchestrator, QueueDispatcher,
};
use travel_backend::workers::NotificationWorker;

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

async fn shutdown_signal_with_notify(shutdown_tx: watch::Sender<bool>) {
    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        skip_externals = config.skip_externals,
        "🚀 Starting travel booking backend"
    );

    let chapa_config = ChapaConfig::from_env()?;
    info!(
        base_url = %chapa_config.base_url,
        currency = %chapa_config.currency,
        webhook_secret_set = chapa_config.webhook_secret.is_some(),
        "💳 Payment gateway configured"
    );
    let currency = chapa_config.currency.clone();
    let gateway: Arc<dyn PaymentGateway> = Arc::new(ChapaGateway::new(chapa_config)?);

    let (db_pool, bookings, payments): (
        Option<sqlx::PgPool>,
        Arc<dyn BookingLedger>,
        Arc<dyn PaymentRecordStore>,
    ) = match &config.database {
        Some(database) => {
            info!("📊 Initializing database connection pool...");
            let pool = init_pool_from_config(database).await.map_err(|e| {
                error!("Failed to initialize database pool: {}", e);
                e
            })?;
            info!("✅ Database connection pool initialized");
            let bookings: Arc<dyn BookingLedger> = Arc::new(BookingRepository::new(pool.clone()));
            let payments: Arc<dyn PaymentRecordStore> =
                Arc::new(PaymentRepository::new(pool.clone()));
            (Some(pool), bookings, payments)
        }
        None => {
            warn!("⏭️  Running on in-memory stores (SKIP_EXTERNALS=true)");
            let store = Arc::new(InMemoryStore::new());
            let bookings: Arc<dyn BookingLedger> = store.clone();
            let payments: Arc<dyn PaymentRecordStore> = store;
            (None, bookings, payments)
        }
    };

    let (dispatcher, receiver) = QueueDispatcher::channel(config.notifications.queue_capacity);
    let (worker_shutdown_tx, worker_shutdown_rx) = watch::channel(false);
    let worker = NotificationWorker::new(
        receiver,
        Arc::new(LogMailer::new()),
        bookings.clone(),
        config.notifications.clone(),
    );
    let worker_handle = tokio::spawn(worker.run(worker_shutdown_rx));
    info!("✅ Notification worker started");

    let notifications = Arc::new(dispatcher.clone());
    let orchestrator = Arc::new(PaymentOrchestrator::new(
        bookings.clone(),
        payments.clone(),
        gateway.clone(),
        notifications.clone(),
        OrchestratorConfig {
            public_base_url: config.server.public_base_url.clone(),
            currency,
        },
    ));
    let booking_service = Arc::new(BookingService::new(bookings, payments, notifications));

    let state = AppState {
        orchestrator,
        bookings: booking_service,
        gateway,
        auth: Arc::new(JwtAuth::new(&config.auth.jwt_secret)),
        health_checker: HealthChecker::new(db_pool, Some(dispatcher)),
        public_base_url: config.server.public_base_url.clone(),
    };

    info!("🛣️  Setting up application routes...");
    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(
        address = %addr,
        public_base_url = %config.server.public_base_url,
        "🚀 Server listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_with_notify(worker_shutdown_tx.clone()))
        .await?;

    let _ = worker_shutdown_tx.send(true);
    if tokio::time::timeout(std::time::Duration::from_secs(5), worker_handle)
        .await
        .is_err()
    {
        error!("Timed out waiting for notification worker shutdown");
    }

    info!("👋 Server shutdown complete");

    Ok(())
}
