use serde::Deserialize;
use validator::Validate;

use crate::utils::validation::{validate_not_empty, validate_registration_number};

// Request para crear un vehículo
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    #[validate(custom = "validate_registration_number")]
    pub registration_number: String,
    #[validate(custom = "validate_not_empty", length(max = 100))]
    pub make: String,
    #[validate(custom = "validate_not_empty", length(max = 100))]
    pub model: String,
    pub year: i32,
}

// Query de `GET /api/vehicles/expiring`; sin `days` se usa la ventana de aviso
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ExpiringVehiclesQuery {
    #[validate(range(min = 1, max = 365))]
    pub days: Option<i64>,
}

// Request para cambiar la matrícula; el motor de reglas valida el contenido
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeLicensePlateRequest {
    pub new_registration_number: String,
    pub reason: String,
    pub has_technical_validity_certificate: bool,
    pub technical_validity_certificate_date: Option<String>,
    pub has_insurance_proof: bool,
    pub has_owner_identity_proof: bool,
    pub has_payment_confirmation: bool,
    pub has_previous_license_plate: bool,
}
