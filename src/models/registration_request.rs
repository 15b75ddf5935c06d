//! Modelo de RegistrationRequest

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Tipo de solicitud de registro
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    #[serde(alias = "new")]
    New,
    #[serde(alias = "renewal")]
    Renewal,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::New => "new",
            RequestType::Renewal => "renewal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Some(RequestType::New),
            "renewal" => Some(RequestType::Renewal),
            _ => None,
        }
    }
}

/// Estado de la solicitud
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "approved")]
    Approved,
    #[serde(alias = "rejected")]
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

/// Solicitud de registro o renovación. Inmutable una vez aprobada o rechazada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub id: i64,
    pub vehicle_id: i64,
    pub user_id: String,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub period_months: i32,
    pub technical_inspection_date: NaiveDate,
    pub insurance_doc_path: Option<String>,
    pub inspection_doc_path: Option<String>,
    pub identity_doc_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub rejection_reason: Option<String>,
}

impl RegistrationRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}
