//! Cliente del servicio de notificaciones (email)

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{build_http_client, error_for_status, trim_base_url, GatewayError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub user_id: String,
    pub recipient_email: String,
    pub subject: String,
    pub message: String,
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(
        &self,
        notification: &NotificationMessage,
        credential: Option<&str>,
    ) -> Result<(), GatewayError>;
}

pub struct HttpNotificationClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpNotificationClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            base_url: trim_base_url(base_url),
            client: build_http_client(timeout)?,
        })
    }
}

#[async_trait]
impl NotificationGateway for HttpNotificationClient {
    async fn send(
        &self,
        notification: &NotificationMessage,
        credential: Option<&str>,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/api/notification/send", self.base_url);

        let mut request = self.client.post(&url).json(notification);
        if let Some(token) = credential {
            request = request.bearer_auth(token);
        }

        error_for_status(request.send().await?).await?;
        log::debug!("📧 Notification '{}' accepted for user {}", notification.subject, notification.user_id);
        Ok(())
    }
}
