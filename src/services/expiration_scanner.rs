//! Escáner de vencimientos
//!
//! Tarea periódica independiente del tráfico HTTP: busca vehículos
//! registrados cuyo vencimiento cae en la ventana de aviso y notifica a sus
//! propietarios. Solo lee el store; nunca modifica vehículos.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::watch;

use super::metrics;
use super::notifier::{Notifier, NotifyOutcome};
use crate::clients::IdentityGateway;
use crate::models::Vehicle;
use crate::repositories::vehicle_store::VehicleStore;
use crate::utils::errors::AppResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub candidates: usize,
    pub sent: usize,
    pub failed: usize,
    /// No intentados porque llegó la señal de parada
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ScannerSettings {
    pub interval: Duration,
    pub warning_days: i64,
    pub concurrency: usize,
}

pub struct ExpirationScanner {
    store: Arc<dyn VehicleStore>,
    identity: Arc<dyn IdentityGateway>,
    notifier: Notifier,
    settings: ScannerSettings,
}

/// Texto del aviso; `days` son días completos hasta el vencimiento
pub fn expiration_message(vehicle: &Vehicle, expires_at: DateTime<Utc>, days: i64) -> String {
    format!(
        "Your vehicle registration for {} ({} {}) will expire on {}. That's in {} days. \
         Please renew your registration to avoid penalties.",
        vehicle.registration_number,
        vehicle.make,
        vehicle.model,
        expires_at.format("%Y-%m-%d"),
        days
    )
}

impl ExpirationScanner {
    pub fn new(
        store: Arc<dyn VehicleStore>,
        identity: Arc<dyn IdentityGateway>,
        notifier: Notifier,
        settings: ScannerSettings,
    ) -> Self {
        Self {
            store,
            identity,
            notifier,
            settings,
        }
    }

    /// Bucle principal: una pasada por intervalo hasta recibir la señal de
    /// parada. La primera pasada ocurre al arrancar.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "⏰ Expiration scanner started (every {:?}, warning window {} days)",
            self.settings.interval,
            self.settings.warning_days
        );
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            if let Err(e) = self.scan(Utc::now(), &shutdown).await {
                log::error!("❌ Expiration scan failed: {}", e);
            }
            if *shutdown.borrow() {
                break;
            }
        }
        log::info!("⏹️ Expiration scanner stopped");
    }

    /// Una pasada completa, sin señal de parada
    pub async fn scan_once(&self, now: DateTime<Utc>) -> AppResult<ScanSummary> {
        let (_keep, never) = watch::channel(false);
        self.scan(now, &never).await
    }

    pub async fn scan(&self, now: DateTime<Utc>, shutdown: &watch::Receiver<bool>) -> AppResult<ScanSummary> {
        let until = now + chrono::Duration::days(self.settings.warning_days);
        let vehicles = self.store.vehicles_expiring_between(now, until).await?;
        log::info!(
            "🔎 Found {} vehicles expiring within {} days",
            vehicles.len(),
            self.settings.warning_days
        );
        if vehicles.is_empty() {
            return Ok(ScanSummary::default());
        }

        let credential = match self.identity.service_credential().await {
            Ok(token) => token,
            Err(e) => {
                log::warn!("⚠️ Service credential unavailable: {}", e);
                metrics::gateway_failure("identity");
                None
            }
        };

        let candidates = vehicles.len();
        let outcomes: Vec<Option<NotifyOutcome>> = stream::iter(vehicles)
            .map(|vehicle| {
                let credential = credential.as_deref();
                async move {
                    // lo que ya está en vuelo termina; lo nuevo no empieza
                    if *shutdown.borrow() {
                        return None;
                    }
                    Some(self.warn_owner(&vehicle, now, credential).await)
                }
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let mut summary = ScanSummary {
            candidates,
            ..ScanSummary::default()
        };
        for outcome in outcomes {
            match outcome {
                Some(NotifyOutcome::Sent) => summary.sent += 1,
                Some(NotifyOutcome::NoRecipient) | Some(NotifyOutcome::Failed) => summary.failed += 1,
                None => summary.skipped += 1,
            }
        }

        metrics::expiration_scan("sent", summary.sent as u64);
        metrics::expiration_scan("failed", summary.failed as u64);
        log::info!(
            "📬 Expiration batch complete: {} sent, {} failed, {} skipped",
            summary.sent,
            summary.failed,
            summary.skipped
        );
        Ok(summary)
    }

    async fn warn_owner(&self, vehicle: &Vehicle, now: DateTime<Utc>, credential: Option<&str>) -> NotifyOutcome {
        let Some(expires_at) = vehicle.expiration_date else {
            return NotifyOutcome::NoRecipient;
        };
        let days = days_until(expires_at, now);
        self.notifier
            .notify(
                &vehicle.owner_id,
                "Vehicle Registration Expiring Soon",
                &expiration_message(vehicle, expires_at, days),
                credential,
            )
            .await
    }
}

/// Días completos restantes, redondeando hacia arriba
fn days_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = expires_at - now;
    let days = remaining.num_days();
    if remaining > chrono::Duration::days(days) {
        days + 1
    } else {
        days
    }
}
