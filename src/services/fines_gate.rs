//! Control de multas pendientes
//!
//! Multas > 0 bloquean la transición. Si el servicio de tráfico no responde
//! se registra un aviso y se continúa.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use super::metrics;
use crate::clients::EnforcementGateway;
use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinesCheck {
    Clear,
    Outstanding(Decimal),
    Unavailable,
}

#[derive(Clone)]
pub struct FinesGate {
    gateway: Arc<dyn EnforcementGateway>,
    timeout: Duration,
}

impl FinesGate {
    pub fn new(gateway: Arc<dyn EnforcementGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    pub async fn check(&self, registration_number: &str, credential: Option<&str>) -> FinesCheck {
        let call = self.gateway.outstanding_fines(registration_number, credential);
        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(amount)) if amount > Decimal::ZERO => FinesCheck::Outstanding(amount),
            Ok(Ok(_)) => FinesCheck::Clear,
            Ok(Err(e)) => {
                log::warn!(
                    "⚠️ Could not verify fines for {}: {} (continuing)",
                    registration_number,
                    e
                );
                metrics::gateway_failure("enforcement");
                FinesCheck::Unavailable
            }
            Err(_) => {
                log::warn!(
                    "⚠️ Fines check for {} timed out after {:?} (continuing)",
                    registration_number,
                    self.timeout
                );
                metrics::gateway_failure("enforcement");
                FinesCheck::Unavailable
            }
        };

        metrics::fines_gate(match outcome {
            FinesCheck::Clear => "clear",
            FinesCheck::Outstanding(_) => "outstanding",
            FinesCheck::Unavailable => "unavailable",
        });
        outcome
    }

    /// Falla solo si el servicio informa multas impagas
    pub async fn enforce(&self, registration_number: &str, credential: Option<&str>) -> AppResult<()> {
        match self.check(registration_number, credential).await {
            FinesCheck::Outstanding(amount) => Err(AppError::OutstandingFines {
                registration_number: registration_number.to_string(),
                amount,
            }),
            FinesCheck::Clear | FinesCheck::Unavailable => Ok(()),
        }
    }
}
