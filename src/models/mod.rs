//! Modelos del sistema
//! 
//! Este módulo contiene los modelos de dominio del registro de vehículos:
//! vehículos, solicitudes de registro, transferencias de propiedad e
//! historial de propietarios.

pub mod auth;
pub mod ownership_history;
pub mod registration_request;
pub mod vehicle;
pub mod vehicle_transfer;

pub use ownership_history::OwnershipRecord;
pub use registration_request::{RegistrationRequest, RequestStatus, RequestType};
pub use vehicle::{Vehicle, VehicleStatus};
pub use vehicle_transfer::{TransferStatus, VehicleTransfer};
