//! Cliente del servicio de tráfico (multas pendientes)

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use super::{build_http_client, error_for_status, trim_base_url, GatewayError};

#[async_trait]
pub trait EnforcementGateway: Send + Sync {
    /// Total de multas impagas para una matrícula
    async fn outstanding_fines(
        &self,
        registration_number: &str,
        credential: Option<&str>,
    ) -> Result<Decimal, GatewayError>;
}

pub struct HttpEnforcementClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpEnforcementClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            base_url: trim_base_url(base_url),
            client: build_http_client(timeout)?,
        })
    }
}

#[async_trait]
impl EnforcementGateway for HttpEnforcementClient {
    async fn outstanding_fines(
        &self,
        registration_number: &str,
        credential: Option<&str>,
    ) -> Result<Decimal, GatewayError> {
        let url = format!(
            "{}/api/police/status/{}",
            self.base_url,
            urlencoding::encode(registration_number)
        );
        log::debug!("🚓 Checking fines: {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = credential {
            request = request.bearer_auth(token);
        }

        let response = error_for_status(request.send().await?).await?;
        let body: Value = response.json().await?;
        parse_fines(&body)
    }
}

/// El servicio publica el total como `totalFinesDue`; versiones anteriores lo
/// envolvían en `data.outstandingFines`.
fn parse_fines(body: &Value) -> Result<Decimal, GatewayError> {
    let amount = body
        .get("totalFinesDue")
        .or_else(|| body.get("data").and_then(|d| d.get("outstandingFines")))
        .ok_or_else(|| GatewayError::Decode("missing totalFinesDue".to_string()))?;

    let decimal = match amount {
        Value::Number(n) => n
            .as_f64()
            .and_then(|f| Decimal::try_from(f).ok())
            .ok_or_else(|| GatewayError::Decode(format!("invalid fine amount {}", n)))?,
        Value::String(s) => s
            .parse::<Decimal>()
            .map_err(|_| GatewayError::Decode(format!("invalid fine amount '{}'", s)))?,
        other => return Err(GatewayError::Decode(format!("invalid fine amount {}", other))),
    };

    Ok(decimal.round_dp(2))
}
