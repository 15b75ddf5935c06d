//! Envío de notificaciones best-effort
//!
//! Resuelve el email del usuario en el servicio de identidad y envía el
//! mensaje. Los fallos se registran y se cuentan; nunca se propagan.

use std::sync::Arc;
use std::time::Duration;

use super::metrics;
use crate::clients::{IdentityGateway, NotificationGateway, NotificationMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    /// El usuario no existe o no tiene email
    NoRecipient,
    Failed,
}

impl NotifyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyOutcome::Sent => "sent",
            NotifyOutcome::NoRecipient => "no_recipient",
            NotifyOutcome::Failed => "failed",
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    identity: Arc<dyn IdentityGateway>,
    notifications: Arc<dyn NotificationGateway>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(
        identity: Arc<dyn IdentityGateway>,
        notifications: Arc<dyn NotificationGateway>,
        timeout: Duration,
    ) -> Self {
        Self {
            identity,
            notifications,
            timeout,
        }
    }

    pub async fn notify(
        &self,
        user_id: &str,
        subject: &str,
        message: &str,
        credential: Option<&str>,
    ) -> NotifyOutcome {
        let outcome = self.deliver(user_id, subject, message, credential).await;
        metrics::notification(outcome.as_str());
        outcome
    }

    async fn deliver(
        &self,
        user_id: &str,
        subject: &str,
        message: &str,
        credential: Option<&str>,
    ) -> NotifyOutcome {
        let lookup = tokio::time::timeout(self.timeout, self.identity.find_user(user_id, credential)).await;
        let user = match lookup {
            Ok(Ok(Some(user))) => user,
            Ok(Ok(None)) => {
                log::warn!("⚠️ User {} not found, notification '{}' skipped", user_id, subject);
                return NotifyOutcome::NoRecipient;
            }
            Ok(Err(e)) => {
                log::warn!("⚠️ Could not resolve email for user {}: {}", user_id, e);
                metrics::gateway_failure("identity");
                return NotifyOutcome::Failed;
            }
            Err(_) => {
                log::warn!("⚠️ Identity lookup for user {} timed out", user_id);
                metrics::gateway_failure("identity");
                return NotifyOutcome::Failed;
            }
        };

        let Some(email) = user.email.filter(|e| !e.trim().is_empty()) else {
            log::warn!("⚠️ User {} has no email, notification '{}' skipped", user_id, subject);
            return NotifyOutcome::NoRecipient;
        };

        let notification = NotificationMessage {
            user_id: user_id.to_string(),
            recipient_email: email,
            subject: subject.to_string(),
            message: message.to_string(),
        };

        match tokio::time::timeout(self.timeout, self.notifications.send(&notification, credential)).await {
            Ok(Ok(())) => {
                log::info!("📧 Notification '{}' sent to user {}", subject, user_id);
                NotifyOutcome::Sent
            }
            Ok(Err(e)) => {
                log::warn!("⚠️ Notification '{}' to user {} failed: {}", subject, user_id, e);
                metrics::gateway_failure("notification");
                NotifyOutcome::Failed
            }
            Err(_) => {
                log::warn!("⚠️ Notification '{}' to user {} timed out", subject, user_id);
                metrics::gateway_failure("notification");
                NotifyOutcome::Failed
            }
        }
    }
}
