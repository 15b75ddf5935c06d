//! Contrato de persistencia del registro de vehículos
//!
//! Cada operación de flujo (enviar, revisar, transferir, dar de baja, cambiar
//! matrícula) es una sola llamada que corre en una transacción y vuelve a
//! comprobar las precondiciones de las que depende.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::models::{
    vehicle::renewed_expiration, OwnershipRecord, RegistrationRequest, RequestStatus, RequestType,
    Vehicle, VehicleStatus, VehicleTransfer,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("A pending registration request already exists")]
    PendingRegistrationExists,

    #[error("A pending transfer already exists")]
    PendingTransferExists,

    #[error("Registration number {0} already exists")]
    RegistrationNumberTaken(String),

    #[error("Only pending {0} can be processed")]
    NotPending(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub registration_number: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub owner_id: String,
    pub owner_name: String,
}

#[derive(Debug, Clone)]
pub struct NewRegistrationRequest {
    pub vehicle_id: i64,
    pub user_id: String,
    pub request_type: RequestType,
    pub period_months: i32,
    pub technical_inspection_date: NaiveDate,
    pub insurance_doc_path: Option<String>,
    pub inspection_doc_path: Option<String>,
    pub identity_doc_path: Option<String>,
}

#[async_trait]
pub trait VehicleStore: Send + Sync {
    /// Crea el vehículo `unregistered` y abre su primer intervalo de propiedad
    async fn create_vehicle(&self, new: NewVehicle, now: DateTime<Utc>) -> StoreResult<Vehicle>;

    async fn find_vehicle(&self, id: i64) -> StoreResult<Option<Vehicle>>;

    /// ¿Otro vehículo (distinto de `excluding`) usa ya esta matrícula?
    async fn registration_number_exists(
        &self,
        registration_number: &str,
        excluding: Option<i64>,
    ) -> StoreResult<bool>;

    async fn has_pending_registration(&self, vehicle_id: i64) -> StoreResult<bool>;

    async fn has_pending_transfer(&self, vehicle_id: i64) -> StoreResult<bool>;

    /// Vehículos registrados con vencimiento en `(from, to]`
    async fn vehicles_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Vehicle>>;

    /// Historial de propietarios, más reciente primero
    async fn ownership_history(&self, vehicle_id: i64) -> StoreResult<Vec<OwnershipRecord>>;

    async fn insert_registration_request(
        &self,
        new: NewRegistrationRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<RegistrationRequest>;

    async fn find_registration_request(&self, id: i64) -> StoreResult<Option<RegistrationRequest>>;

    async fn list_registration_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> StoreResult<Vec<RegistrationRequest>>;

    async fn list_registration_requests_by_user(
        &self,
        user_id: &str,
    ) -> StoreResult<Vec<RegistrationRequest>>;

    /// Marca la solicitud aprobada y aplica su efecto sobre el vehículo
    async fn approve_registration(
        &self,
        request_id: i64,
        reviewer: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<(RegistrationRequest, Vehicle)>;

    async fn reject_registration(
        &self,
        request_id: i64,
        reviewer: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<RegistrationRequest>;

    async fn insert_transfer(
        &self,
        vehicle_id: i64,
        from_user_id: &str,
        to_user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<VehicleTransfer>;

    async fn find_transfer(&self, id: i64) -> StoreResult<Option<VehicleTransfer>>;

    /// Transferencias enviadas o recibidas por el usuario
    async fn list_transfers_for_user(&self, user_id: &str) -> StoreResult<Vec<VehicleTransfer>>;

    async fn list_pending_transfers_for_recipient(
        &self,
        user_id: &str,
    ) -> StoreResult<Vec<VehicleTransfer>>;

    /// Cierra el intervalo abierto, abre uno para el destinatario y cambia
    /// el propietario del vehículo
    async fn accept_transfer(
        &self,
        transfer_id: i64,
        new_owner_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<(VehicleTransfer, Vehicle)>;

    async fn reject_transfer(&self, transfer_id: i64, now: DateTime<Utc>) -> StoreResult<VehicleTransfer>;

    async fn deregister_vehicle(&self, vehicle_id: i64) -> StoreResult<Vehicle>;

    async fn change_registration_number(
        &self,
        vehicle_id: i64,
        new_registration_number: &str,
    ) -> StoreResult<Vehicle>;
}

/// Vehículo resultante de aprobar `request`. Compartido por todas las
/// implementaciones para que la regla de vencimiento viva en un único sitio.
pub fn approved_vehicle(
    vehicle: &Vehicle,
    request: &RegistrationRequest,
    now: DateTime<Utc>,
) -> StoreResult<Vehicle> {
    if vehicle.status.is_terminal() {
        return Err(StoreError::InvalidTransition(format!(
            "vehicle {} is deregistered",
            vehicle.registration_number
        )));
    }

    let mut updated = vehicle.clone();
    match request.request_type {
        RequestType::New => {
            if vehicle.status != VehicleStatus::Unregistered {
                return Err(StoreError::InvalidTransition(format!(
                    "vehicle {} is already registered",
                    vehicle.registration_number
                )));
            }
            updated.status = VehicleStatus::Registered;
        }
        RequestType::Renewal => {
            if vehicle.status != VehicleStatus::Registered {
                return Err(StoreError::InvalidTransition(format!(
                    "vehicle {} is not registered",
                    vehicle.registration_number
                )));
            }
            let months = u32::try_from(request.period_months).map_err(|_| {
                StoreError::Corrupt(format!("request {} has period {}", request.id, request.period_months))
            })?;
            updated.expiration_date = Some(renewed_expiration(vehicle.expiration_date, now, months));
            updated.status = VehicleStatus::Registered;
        }
    }
    Ok(updated)
}

/// Estado de partida exigido para guardar una solicitud del tipo dado
pub fn check_submission_state(vehicle: &Vehicle, request_type: RequestType) -> StoreResult<()> {
    let expected = match request_type {
        RequestType::New => VehicleStatus::Unregistered,
        RequestType::Renewal => VehicleStatus::Registered,
    };
    if vehicle.status != expected {
        return Err(StoreError::InvalidTransition(format!(
            "vehicle {} is {}, {} requests need {}",
            vehicle.registration_number,
            vehicle.status,
            request_type.as_str(),
            expected
        )));
    }
    Ok(())
}
