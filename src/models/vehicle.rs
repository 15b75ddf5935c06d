//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle, su máquina de estados y la
//! aritmética de fechas de vencimiento usada por aprobaciones y el escáner.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// Días antes del vencimiento en los que se abre la ventana de renovación
pub const RENEWAL_WINDOW_DAYS: i64 = 30;

/// Período de renovación por defecto (meses)
pub const DEFAULT_RENEWAL_MONTHS: u32 = 12;

/// Estado del vehículo
///
/// `active` es un sinónimo heredado de `registered`: se acepta al leer
/// (base de datos o JSON) pero nunca se escribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    #[serde(alias = "Unregistered")]
    Unregistered,
    #[serde(alias = "Registered", alias = "active", alias = "Active")]
    Registered,
    #[serde(alias = "Deregistered")]
    Deregistered,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Unregistered => "unregistered",
            VehicleStatus::Registered => "registered",
            VehicleStatus::Deregistered => "deregistered",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unregistered" => Some(VehicleStatus::Unregistered),
            "registered" | "active" => Some(VehicleStatus::Registered),
            "deregistered" => Some(VehicleStatus::Deregistered),
            _ => None,
        }
    }

    /// Deregistered es terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, VehicleStatus::Deregistered)
    }
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: i64,
    pub registration_number: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub owner_id: String,
    pub owner_name: String,
    pub status: VehicleStatus,
    pub expiration_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Días completos hasta el vencimiento (negativo si ya venció)
    pub fn days_until_expiration(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expiration_date.map(|exp| (exp - now).num_days())
    }

    /// Un vehículo registrado puede renovarse si vence dentro de la ventana
    /// o ya venció. Sin fecha de vencimiento se considera vencido.
    pub fn renewal_window_open(&self, now: DateTime<Utc>) -> bool {
        match self.expiration_date {
            Some(exp) => exp <= now + Duration::days(RENEWAL_WINDOW_DAYS),
            None => true,
        }
    }
}

/// Nuevo vencimiento tras una renovación: `max(now, actual) + months`
pub fn renewed_expiration(
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    months: u32,
) -> DateTime<Utc> {
    let base = match current {
        Some(exp) if exp > now => exp,
        _ => now,
    };
    base.checked_add_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn vehicle(expiration: Option<DateTime<Utc>>) -> Vehicle {
        Vehicle {
            id: 1,
            registration_number: "BG-123-AA".to_string(),
            make: "Skoda".to_string(),
            model: "Octavia".to_string(),
            year: 2019,
            owner_id: "7".to_string(),
            owner_name: "Ana".to_string(),
            status: VehicleStatus::Registered,
            expiration_date: expiration,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_legacy_active_status_maps_to_registered() {
        assert_eq!(VehicleStatus::from_str("Active"), Some(VehicleStatus::Registered));
        assert_eq!(VehicleStatus::from_str("registered"), Some(VehicleStatus::Registered));
        assert_eq!(VehicleStatus::from_str("Suspended"), None);

        let parsed: VehicleStatus = serde_json::from_str("\"Active\"").unwrap();
        assert_eq!(parsed, VehicleStatus::Registered);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"registered\"");
    }

    #[test]
    fn test_renewal_extends_from_future_expiration() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let current = Utc.with_ymd_and_hms(2026, 3, 11, 12, 0, 0).unwrap();
        let renewed = renewed_expiration(Some(current), now, 12);
        assert_eq!(renewed, Utc.with_ymd_and_hms(2027, 3, 11, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_renewal_extends_from_now_when_expired() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let current = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(
            renewed_expiration(Some(current), now, 12),
            Utc.with_ymd_and_hms(2027, 3, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(
            renewed_expiration(None, now, 6),
            Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_renewal_window() {
        let now = Utc::now();
        assert!(vehicle(Some(now + Duration::days(10))).renewal_window_open(now));
        assert!(vehicle(Some(now - Duration::days(3))).renewal_window_open(now));
        assert!(vehicle(None).renewal_window_open(now));
        assert!(!vehicle(Some(now + Duration::days(45))).renewal_window_open(now));
    }
}
