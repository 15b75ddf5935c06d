//! Utilidades de validación
//!
//! Funciones helper usadas por los DTOs (`validator`) y por el motor de
//! reglas: matrículas, fechas y años de fabricación.

use chrono::{Datelike, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// Bloques alfanuméricos separados opcionalmente por guion o espacio
    static ref REGISTRATION_NUMBER: Regex =
        Regex::new(r"^[A-Za-z0-9]{1,4}([- ]?[A-Za-z0-9]{1,4}){1,3}$")
            .expect("registration number pattern");
}

/// Validar formato de matrícula de vehículo (p.ej. `BG-123-AA`)
pub fn validate_registration_number(value: &str) -> Result<(), ValidationError> {
    let clean_plate = value.replace([' ', '-'], "");
    if clean_plate.len() < 4 || clean_plate.len() > 10 || !REGISTRATION_NUMBER.is_match(value.trim()) {
        let mut error = ValidationError::new("registration_number");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Normalizar matrícula para almacenamiento y comparación
pub fn normalize_registration_number(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

/// Validar y convertir string a fecha
pub fn validate_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        let mut error = ValidationError::new("date");
        error.add_param("value".into(), &value.to_string());
        error.add_param("format".into(), &"YYYY-MM-DD".to_string());
        error
    })
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Año de fabricación entre 1900 y el año próximo
pub fn validate_model_year(value: i32) -> Result<(), ValidationError> {
    let max = Utc::now().year() + 1;
    if !(1900..=max).contains(&value) {
        let mut error = ValidationError::new("year");
        error.add_param("min".into(), &1900);
        error.add_param("max".into(), &max);
        error.add_param("actual".into(), &value);
        return Err(error);
    }
    Ok(())
}
