use serde::Deserialize;
use validator::Validate;

use crate::models::RequestType;

/// Documento adjunto en base64 (admite data URLs)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    pub file_name: Option<String>,
    #[serde(alias = "content")]
    pub content_base64: Option<String>,
}

// Request para enviar una solicitud de registro o renovación
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRegistrationRequest {
    #[validate(range(min = 1))]
    pub vehicle_id: i64,
    #[serde(rename = "type", alias = "requestType")]
    pub request_type: RequestType,
    pub technical_inspection_date: String,
    pub period_months: Option<u32>,
    pub insurance_document: Option<DocumentPayload>,
    pub technical_inspection_document: Option<DocumentPayload>,
    pub identity_document: Option<DocumentPayload>,
}

// Request de revisión (solo administradores)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRegistrationRequest {
    pub approve: bool,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationListQuery {
    pub status: Option<String>,
}
