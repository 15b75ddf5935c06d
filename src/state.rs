//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::environment::EnvironmentConfig;
use crate::services::LifecycleService;
use crate::utils::jwt::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EnvironmentConfig>,
    pub lifecycle: LifecycleService,
    pub jwt: JwtConfig,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, lifecycle: LifecycleService) -> Self {
        let jwt = JwtConfig::from(&config);
        Self {
            config: Arc::new(config),
            lifecycle,
            jwt,
        }
    }
}

impl FromRef<AppState> for JwtConfig {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
