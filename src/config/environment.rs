//! Configuración de variables de entorno
//!
//! Este módulo carga la configuración del servicio desde el entorno (con
//! soporte de `.env` vía dotenvy en `main`). Los valores numéricos inválidos
//! se reportan como error; nunca se hace panic.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const DEV_JWT_SECRET: &str = "development-secret-change-me";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be set in {environment}")]
    Missing { key: String, environment: String },

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: String, value: String },
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    // Servicios externos
    pub identity_service_url: String,
    pub enforcement_service_url: String,
    pub notification_service_url: String,
    pub external_timeout_secs: u64,
    pub identity_service_token: Option<String>,
    pub service_account_username: Option<String>,
    pub service_account_password: Option<String>,
    pub uploads_dir: String,
    // Escáner de vencimientos
    pub expiration_scan_interval_secs: u64,
    pub expiration_warning_days: i64,
    pub expiration_scan_concurrency: usize,
    pub shutdown_grace_secs: u64,
}

impl EnvironmentConfig {
    /// Carga desde las variables de entorno del proceso
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Carga usando una fuente arbitraria de variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let environment = get_or("ENVIRONMENT", "development");
        let is_production = environment.eq_ignore_ascii_case("production");

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if is_production => {
                return Err(ConfigError::Missing {
                    key: "JWT_SECRET".to_string(),
                    environment,
                })
            }
            None => DEV_JWT_SECRET.to_string(),
        };

        Ok(Self {
            host: get_or("HOST", "0.0.0.0"),
            port: parse_or(&get, "PORT", 5002)?,
            database_url: get("DATABASE_URL"),
            jwt_secret,
            jwt_issuer: get("JWT_ISSUER"),
            cors_origins: get("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            log_level: get_or("LOG_LEVEL", "info"),
            identity_service_url: get_or("IDENTITY_SERVICE_URL", "http://localhost:5001"),
            enforcement_service_url: get_or("ENFORCEMENT_SERVICE_URL", "http://localhost:5004"),
            notification_service_url: get_or("NOTIFICATION_SERVICE_URL", "http://localhost:5005"),
            external_timeout_secs: parse_or(&get, "EXTERNAL_TIMEOUT_SECS", 10)?,
            identity_service_token: get("IDENTITY_SERVICE_TOKEN"),
            service_account_username: get("SERVICE_ACCOUNT_USERNAME"),
            service_account_password: get("SERVICE_ACCOUNT_PASSWORD"),
            uploads_dir: get_or("UPLOADS_DIR", "./uploads"),
            expiration_scan_interval_secs: parse_or(&get, "EXPIRATION_SCAN_INTERVAL_SECS", 86_400)?,
            expiration_warning_days: parse_or(&get, "EXPIRATION_WARNING_DAYS", 30)?,
            expiration_scan_concurrency: parse_or(&get, "EXPIRATION_SCAN_CONCURRENCY", 4)?,
            shutdown_grace_secs: parse_or(&get, "SHUTDOWN_GRACE_SECS", 15)?,
            environment,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<EnvironmentConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvironmentConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.environment, "development");
        assert_eq!(config.port, 5002);
        assert_eq!(config.bind_address(), "0.0.0.0:5002");
        assert!(config.database_url.is_none());
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.expiration_scan_interval_secs, 86_400);
        assert_eq!(config.expiration_warning_days, 30);
        assert_eq!(config.expiration_scan_concurrency, 4);
        assert_eq!(config.shutdown_grace(), Duration::from_secs(15));
        assert_eq!(config.external_timeout(), Duration::from_secs(10));
        assert_eq!(config.uploads_dir, "./uploads");
    }

    #[test]
    fn test_overrides_and_lists() {
        let config = load(&[
            ("PORT", "8080"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("DATABASE_URL", "postgres://u:p@db/registry"),
            ("EXPIRATION_WARNING_DAYS", "14"),
            ("JWT_ISSUER", "identity"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.database_url.as_deref(), Some("postgres://u:p@db/registry"));
        assert_eq!(config.expiration_warning_days, 14);
        assert_eq!(config.jwt_issuer.as_deref(), Some("identity"));
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "PORT".to_string(),
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn test_production_requires_secret() {
        let err = load(&[("ENVIRONMENT", "production")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref key, .. } if key == "JWT_SECRET"));

        let config = load(&[("ENVIRONMENT", "production"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert!(config.is_production());
        assert_eq!(config.jwt_secret, "s3cret");
    }
}
