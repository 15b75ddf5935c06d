//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

use crate::repositories::vehicle_store::StoreError;
use crate::services::validation_engine::{Violation, ViolationCategory};

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("State conflict: {}", join_messages(.0))]
    StateConflict(Vec<Violation>),

    #[error("Validation failed: {}", join_messages(.0))]
    ValidationFailed(Vec<Violation>),

    #[error("Outstanding fines of {amount} for vehicle {registration_number}")]
    OutstandingFines {
        registration_number: String,
        amount: Decimal,
    },

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("JWT error: {0}")]
    Jwt(String),
}

fn join_messages(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl AppError {
    /// Construye el error adecuado a partir de una lista completa de violaciones.
    /// Cualquier violación de estado convierte la lista en un conflicto.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations
            .iter()
            .any(|v| v.category == ViolationCategory::State)
        {
            AppError::StateConflict(violations)
        } else {
            AppError::ValidationFailed(violations)
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::PendingRegistrationExists => {
                AppError::StateConflict(vec![Violation::pending_registration_exists()])
            }
            StoreError::PendingTransferExists => {
                AppError::StateConflict(vec![Violation::pending_transfer_exists()])
            }
            StoreError::RegistrationNumberTaken(number) => {
                AppError::ValidationFailed(vec![Violation::registration_number_taken(&number)])
            }
            StoreError::NotPending(what) => {
                AppError::StateConflict(vec![Violation::not_pending(&what)])
            }
            StoreError::InvalidTransition(message) => {
                AppError::StateConflict(vec![Violation::state("invalid_transition", message)])
            }
            StoreError::Corrupt(message) => AppError::Internal(message),
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            AppError::Database(e) => {
                log::error!("❌ Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Database Error".to_string(),
                        message: "An error occurred while accessing the database".to_string(),
                        details: None,
                        code: Some("DB_ERROR".to_string()),
                    },
                )
            }

            AppError::Validation(e) => {
                log::warn!("⚠️ Validation error: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: "Validation Error".to_string(),
                        message: "The provided data is invalid".to_string(),
                        details: Some(json!(e)),
                        code: Some("VALIDATION_ERROR".to_string()),
                    },
                )
            }

            AppError::Unauthorized(msg) => {
                log::warn!("🔒 Unauthorized access: {}", msg);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse {
                        error: "Unauthorized".to_string(),
                        message: msg,
                        details: None,
                        code: Some("UNAUTHORIZED".to_string()),
                    },
                )
            }

            AppError::Forbidden(msg) => {
                log::warn!("🔒 Forbidden access: {}", msg);
                (
                    StatusCode::FORBIDDEN,
                    ErrorResponse {
                        error: "Forbidden".to_string(),
                        message: msg,
                        details: None,
                        code: Some("FORBIDDEN".to_string()),
                    },
                )
            }

            AppError::NotFound(msg) => {
                log::info!("🔍 Resource not found: {}", msg);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse {
                        error: "Not Found".to_string(),
                        message: msg,
                        details: None,
                        code: Some("NOT_FOUND".to_string()),
                    },
                )
            }

            AppError::BadRequest(msg) => {
                log::warn!("⚠️ Bad request: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: "Bad Request".to_string(),
                        message: msg,
                        details: None,
                        code: Some("BAD_REQUEST".to_string()),
                    },
                )
            }

            AppError::StateConflict(violations) => {
                log::warn!("⚠️ State conflict: {}", join_messages(&violations));
                let only_pending = violations.iter().all(|v| v.is_pending_conflict());
                (
                    StatusCode::CONFLICT,
                    ErrorResponse {
                        error: "Conflict".to_string(),
                        message: join_messages(&violations),
                        details: Some(json!({ "violations": violations })),
                        code: Some(
                            if only_pending { "PENDING_REQUEST_EXISTS" } else { "STATE_CONFLICT" }
                                .to_string(),
                        ),
                    },
                )
            }

            AppError::ValidationFailed(violations) => {
                log::warn!("⚠️ Business validation failed: {}", join_messages(&violations));
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorResponse {
                        error: "Validation Failed".to_string(),
                        message: join_messages(&violations),
                        details: Some(json!({ "violations": violations })),
                        code: Some("RULES_VIOLATED".to_string()),
                    },
                )
            }

            AppError::OutstandingFines { registration_number, amount } => {
                log::warn!(
                    "🚫 Outstanding fines {} for vehicle {}",
                    amount,
                    registration_number
                );
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorResponse {
                        error: "Outstanding Fines".to_string(),
                        message: format!(
                            "Vehicle {} has unpaid fines of {}. All fines must be paid first.",
                            registration_number, amount
                        ),
                        details: Some(json!({
                            "fineAmount": amount,
                            "registrationNumber": registration_number,
                        })),
                        code: Some("OUTSTANDING_FINES".to_string()),
                    },
                )
            }

            AppError::Internal(msg) => {
                log::error!("❌ Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal Server Error".to_string(),
                        message: "An unexpected error occurred".to_string(),
                        details: None,
                        code: Some("INTERNAL_ERROR".to_string()),
                    },
                )
            }

            AppError::Jwt(msg) => {
                log::warn!("🔒 JWT error: {}", msg);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse {
                        error: "JWT Error".to_string(),
                        message: msg,
                        details: None,
                        code: Some("JWT_ERROR".to_string()),
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de acceso prohibido
pub fn forbidden_error(operation: &str, reason: &str) -> AppError {
    AppError::Forbidden(format!("Cannot {}: {}", operation, reason))
}
