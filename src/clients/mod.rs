//! Clients - HTTP clients for the collaborating services
//!
//! Cada servicio externo se expone detrás de un trait estrecho para que los
//! servicios de dominio puedan usar fakes en tests.

pub mod enforcement_client;
pub mod identity_client;
pub mod notification_client;

use thiserror::Error;

pub use enforcement_client::{EnforcementGateway, HttpEnforcementClient};
pub use identity_client::{HttpIdentityClient, IdentityGateway, IdentityUser};
pub use notification_client::{HttpNotificationClient, NotificationGateway, NotificationMessage};

/// Fallo al hablar con un servicio externo
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("not configured: {0}")]
    NotConfigured(String),
}

/// Construye el cliente HTTP compartido por un gateway
pub(crate) fn build_http_client(timeout: std::time::Duration) -> Result<reqwest::Client, GatewayError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("vehicle-registry/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

pub(crate) fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Convierte una respuesta no exitosa en `GatewayError::Status`
pub(crate) async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        status: status.as_u16(),
        body,
    })
}
