use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estado de una transferencia de propiedad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "accepted")]
    Accepted,
    #[serde(alias = "rejected")]
    Rejected,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Accepted => "accepted",
            TransferStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(TransferStatus::Pending),
            "accepted" => Some(TransferStatus::Accepted),
            "rejected" => Some(TransferStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleTransfer {
    pub id: i64,
    pub vehicle_id: i64,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl VehicleTransfer {
    pub fn is_pending(&self) -> bool {
        self.status == TransferStatus::Pending
    }

    /// Solo el remitente o el destinatario pueden ver la transferencia
    pub fn involves(&self, user_id: &str) -> bool {
        self.from_user_id == user_id || self.to_user_id == user_id
    }
}
