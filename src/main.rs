use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use vehicle_registry::clients::identity_client::ServiceAccount;
use vehicle_registry::clients::{
    EnforcementGateway, HttpEnforcementClient, HttpIdentityClient, HttpNotificationClient, IdentityGateway,
    NotificationGateway,
};
use vehicle_registry::config::EnvironmentConfig;
use vehicle_registry::database::connect_and_migrate;
use vehicle_registry::repositories::{MemoryVehicleStore, VehicleStore};
use vehicle_registry::services::document_storage::DocumentStorage;
use vehicle_registry::services::{ExpirationScanner, FinesGate, LifecycleService, Notifier, ScannerSettings};
use vehicle_registry::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    let level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("🚗 Vehicle Registry ({})", config.environment);
    info!("================================================");

    // Persistencia
    let store: Arc<dyn VehicleStore> = match config.database_url.as_deref() {
        Some(url) => Arc::new(connect_and_migrate(url).await?),
        None => {
            warn!("⚠️ DATABASE_URL not set, using the in-memory store (data is lost on restart)");
            Arc::new(MemoryVehicleStore::new())
        }
    };

    // Servicios externos
    let timeout = config.external_timeout();
    let service_account = match (&config.service_account_username, &config.service_account_password) {
        (Some(username), Some(password)) => Some(ServiceAccount {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    };
    let identity: Arc<dyn IdentityGateway> = Arc::new(HttpIdentityClient::new(
        &config.identity_service_url,
        timeout,
        config.identity_service_token.clone(),
        service_account,
    )?);
    let enforcement: Arc<dyn EnforcementGateway> =
        Arc::new(HttpEnforcementClient::new(&config.enforcement_service_url, timeout)?);
    let notifications: Arc<dyn NotificationGateway> =
        Arc::new(HttpNotificationClient::new(&config.notification_service_url, timeout)?);

    let notifier = Notifier::new(identity.clone(), notifications, timeout);
    let lifecycle = LifecycleService::new(
        store.clone(),
        identity.clone(),
        FinesGate::new(enforcement, timeout),
        notifier.clone(),
        DocumentStorage::new(&config.uploads_dir),
        timeout,
    );

    // Escáner de vencimientos
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scanner = ExpirationScanner::new(
        store,
        identity,
        notifier,
        ScannerSettings {
            interval: Duration::from_secs(config.expiration_scan_interval_secs.max(1)),
            warning_days: config.expiration_warning_days,
            concurrency: config.expiration_scan_concurrency,
        },
    );
    let scanner_handle = tokio::spawn(scanner.run(shutdown_rx));

    let grace = config.shutdown_grace();
    let addr = config.bind_address();
    let app = create_router(AppState::new(config, lifecycle));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🌐 Server listening on http://{}", addr);
    info!("   GET  /health, GET /metrics");
    info!("   /api/vehicles, /api/registration-requests, /api/vehicle-transfers");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    match tokio::time::timeout(grace, scanner_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("❌ Expiration scanner task failed: {}", e),
        Err(_) => warn!("⚠️ Expiration scanner did not stop within {:?}", grace),
    }

    info!("👋 Server stopped");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Ctrl+C received, shutting down...");
        },
        _ = terminate => {
            info!("🛑 SIGTERM received, shutting down...");
        },
    }
}
