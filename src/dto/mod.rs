//! DTOs de la API
//!
//! Cuerpos JSON (camelCase) de entrada y el envoltorio común de respuesta.

pub mod registration_dto;
pub mod transfer_dto;
pub mod vehicle_dto;

use serde::Serialize;

/// Respuesta estándar `{success, message, data}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}
