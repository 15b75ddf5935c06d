//! Cliente del servicio de identidad
//!
//! Resuelve usuarios (email, estado) y obtiene la credencial de servicio
//! usada por el trabajo en segundo plano.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use super::{build_http_client, error_for_status, trim_base_url, GatewayError};

/// Margen antes del vencimiento en el que se renueva el token de servicio
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Vida asumida del token cuando el login no informa `expiresAt`
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUser {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// `Ok(None)` si el servicio responde que el usuario no existe
    async fn find_user(
        &self,
        user_id: &str,
        credential: Option<&str>,
    ) -> Result<Option<IdentityUser>, GatewayError>;

    /// Credencial para llamadas sin usuario (escáner de vencimientos)
    async fn service_credential(&self) -> Result<Option<String>, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct ServiceAccount {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    data: LoginData,
}

pub struct HttpIdentityClient {
    base_url: String,
    client: reqwest::Client,
    static_token: Option<String>,
    service_account: Option<ServiceAccount>,
    cached: Mutex<Option<CachedToken>>,
}

impl HttpIdentityClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        static_token: Option<String>,
        service_account: Option<ServiceAccount>,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            base_url: trim_base_url(base_url),
            client: build_http_client(timeout)?,
            static_token,
            service_account,
            cached: Mutex::new(None),
        })
    }

    async fn login(&self, account: &ServiceAccount) -> Result<CachedToken, GatewayError> {
        let url = format!("{}/api/auth/login", self.base_url);
        log::info!("🔐 Authenticating service account '{}'", account.username);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "username": account.username, "password": account.password }))
            .send()
            .await?;
        let response = error_for_status(response).await?;
        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("login response: {}", e)))?;

        let expires_at = body
            .data
            .expires_at
            .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(DEFAULT_TOKEN_TTL_SECS));
        log::info!("✅ Service account authenticated until {}", expires_at);

        Ok(CachedToken {
            token: body.data.token,
            expires_at,
        })
    }
}

#[async_trait]
impl IdentityGateway for HttpIdentityClient {
    async fn find_user(
        &self,
        user_id: &str,
        credential: Option<&str>,
    ) -> Result<Option<IdentityUser>, GatewayError> {
        let url = format!(
            "{}/api/auth/users/{}",
            self.base_url,
            urlencoding::encode(user_id)
        );

        let mut request = self.client.get(&url);
        if let Some(token) = credential {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = error_for_status(response).await?;
        let user: IdentityUser = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("user {}: {}", user_id, e)))?;
        Ok(Some(user))
    }

    async fn service_credential(&self) -> Result<Option<String>, GatewayError> {
        if let Some(token) = &self.static_token {
            return Ok(Some(token.clone()));
        }
        let Some(account) = &self.service_account else {
            return Ok(None);
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(Some(token.token.clone()));
        }

        let fresh = self.login(account).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(Some(token))
    }
}
