use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Intervalo de propiedad. `to_date == None` marca al propietario actual;
/// como máximo un intervalo abierto por vehículo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipRecord {
    pub id: i64,
    pub vehicle_id: i64,
    pub owner_id: String,
    pub owner_name: String,
    pub from_date: DateTime<Utc>,
    pub to_date: Option<DateTime<Utc>>,
}

impl OwnershipRecord {
    pub fn is_open(&self) -> bool {
        self.to_date.is_none()
    }
}
