//! Controllers
//!
//! Traducen DTOs a comandos del `LifecycleService` y envuelven el resultado
//! en `ApiResponse`. No contienen reglas de negocio.

pub mod registration_controller;
pub mod transfer_controller;
pub mod vehicle_controller;

use chrono::{DateTime, NaiveDate};
use validator::{ValidationError, ValidationErrors};

use crate::utils::errors::AppError;
use crate::utils::validation::validate_date;

/// Acepta `YYYY-MM-DD` o una fecha RFC 3339 completa
pub(crate) fn parse_date_field(field: &'static str, value: &str) -> Result<NaiveDate, AppError> {
    let value = value.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.date_naive());
    }
    validate_date(value).map_err(|error| field_error(field, error))
}

pub(crate) fn field_error(field: &'static str, error: ValidationError) -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    AppError::Validation(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_field() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(parse_date_field("date", "2026-03-01").unwrap(), expected);
        assert_eq!(parse_date_field("date", "2026-03-01T10:00:00Z").unwrap(), expected);
        assert!(matches!(
            parse_date_field("date", "01/03/2026"),
            Err(AppError::Validation(_))
        ));
    }
}
