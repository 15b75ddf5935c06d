use serde::Deserialize;
use validator::Validate;

// Request para iniciar una transferencia de propiedad
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferRequest {
    #[validate(range(min = 1))]
    pub vehicle_id: i64,
    // vacío o propio lo rechaza el motor de reglas
    #[serde(default)]
    pub to_user_id: String,
}

// Respuesta del destinatario
#[derive(Debug, Deserialize)]
pub struct RespondTransferRequest {
    pub accept: bool,
}
