//! Server runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: metrics recorder, database and
//! migrations, services and payment gateways, the REST API and graceful
//! shutdown. Both binaries start the service through it.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use crate::application::events::{create_event_bus, EventBusNotifier, SharedEventBus};
use crate::application::payments::{MomoGateway, PaymentGateway, VnPayGateway};
use crate::application::ports::Notifier;
use crate::application::services::{
    AvailabilityService, BookingService, PaymentService, ProgressService, ReservationService,
    SessionService,
};
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
use crate::interfaces::http::{create_api_router, AppServices, RouterDeps};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true)
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

/// Wire repositories, notifier and gateways into the application services.
pub fn build_services(
    repos: Arc<dyn RepositoryProvider>,
    event_bus: SharedEventBus,
    cfg: &AppConfig,
) -> AppServices {
    let notifier: Arc<dyn Notifier> = Arc::new(EventBusNotifier::new(event_bus));
    let vnpay: Arc<dyn PaymentGateway> = Arc::new(VnPayGateway::new(cfg.payments.vnpay.clone()));
    let momo: Arc<dyn PaymentGateway> = Arc::new(MomoGateway::new(cfg.payments.momo.clone()));

    for (name, check) in [
        ("VNPay", cfg.payments.vnpay.validate()),
        ("MoMo", cfg.payments.momo.validate()),
    ] {
        if let Err(e) = check {
            warn!(provider = name, error = %e, "Payment provider incomplete; requests will fail until configured");
        }
    }

    AppServices {
        availability: Arc::new(AvailabilityService::new(repos.clone())),
        reservations: Arc::new(ReservationService::new(
            repos.clone(),
            notifier.clone(),
            cfg.billing.clone(),
        )),
        sessions: Arc::new(SessionService::new(
            repos.clone(),
            notifier.clone(),
            cfg.billing.clone(),
        )),
        progress: Arc::new(ProgressService::new(repos.clone(), notifier.clone())),
        payments: Arc::new(
            PaymentService::new(repos.clone(), notifier.clone())
                .with_gateway(vnpay.clone())
                .with_gateway(momo),
        ),
        bookings: Arc::new(
            BookingService::new(repos, notifier, cfg.billing.clone()).with_vnpay(vnpay),
        ),
    }
}

/// Handle to a running service.
pub struct ServerHandle {
    pub event_bus: SharedEventBus,
    pub repos: Arc<dyn RepositoryProvider>,
    pub config: AppConfig,
    pub api_port: u16,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        info!("Starting EV charging service...");

        // The global recorder can only be installed once per process.
        use std::sync::OnceLock;
        static PROM_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
            OnceLock::new();
        let prometheus_handle = PROM_HANDLE
            .get_or_init(|| {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .install_recorder()
                    .expect("Failed to install Prometheus metrics recorder")
            })
            .clone();
        info!("📊 Prometheus metrics recorder ready");

        let jwt_config = JwtConfig::from(&app_cfg.security);
        info!(
            issuer = %jwt_config.issuer,
            expiration_hours = jwt_config.expiration_hours,
            "JWT configured"
        );

        let db_config = if app_cfg.database.url.starts_with("sqlite::memory:") {
            DatabaseConfig::in_memory()
        } else {
            DatabaseConfig::new(app_cfg.database.url.clone())
        };
        let db = init_database(&db_config).await?;
        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await?;
            info!("Migrations completed");
        }

        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let event_bus = create_event_bus();
        let services = build_services(repos.clone(), event_bus.clone(), &app_cfg);

        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        let router = create_api_router(RouterDeps {
            services,
            db: db.clone(),
            jwt_config,
            event_bus: event_bus.clone(),
            metrics_handle: Some(prometheus_handle),
        });

        let api_addr = app_cfg.server.address();
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        let api_port = listener.local_addr()?.port();
        info!("REST API listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_server = axum::serve(listener, router).with_graceful_shutdown(async move {
            shutdown_signal.wait().await;
            info!("🛑 REST API received shutdown signal");
        });
        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!(error = %e, "REST API server error");
            }
        });

        Ok(Self {
            event_bus,
            repos,
            config: app_cfg,
            api_port,
            db,
            shutdown,
            api_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install SIGTERM / SIGINT listeners that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Stop accepting requests, drain in-flight ones (bounded by
    /// `shutdown_timeout`), then close the database.
    pub async fn wait(self) {
        let Self {
            db,
            shutdown,
            api_task,
            ..
        } = self;

        let drained = shutdown
            .shutdown_with_cleanup(|| async move {
                if let Err(e) = api_task.await {
                    error!(error = %e, "REST API task panicked");
                }
            })
            .await;
        if !drained {
            warn!("Shutdown timeout reached with requests still in flight");
        }

        match db.close().await {
            Ok(()) => info!("✅ Database connection closed"),
            Err(e) => warn!(error = %e, "Error closing database connection"),
        }
        info!("👋 Shutdown complete");
    }

    pub async fn shutdown(self) {
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Initialise tracing from config. `RUST_LOG` wins over `[logging] level`.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn server_starts_and_stops_on_ephemeral_port() {
        let mut config = AppConfig::default();
        config.server.api_host = "127.0.0.1".into();
        config.server.api_port = 0;
        config.server.shutdown_timeout = 5;
        config.database.url = "sqlite::memory:".into();

        let handle = ServerHandle::start(ServerOptions {
            config,
            auto_migrate: true,
        })
        .await
        .unwrap();
        assert_ne!(handle.api_port, 0);
        assert!(handle.is_running());
        handle.shutdown().await;
    }
}
