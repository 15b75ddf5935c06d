//! Implementación en memoria de `VehicleStore`
//!
//! Todas las operaciones toman el mismo `Mutex`, así que cada llamada es
//! atómica. Se usa en tests y en desarrollo sin `DATABASE_URL`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::vehicle_store::{
    approved_vehicle, check_submission_state, NewRegistrationRequest, NewVehicle, StoreError,
    StoreResult, VehicleStore,
};
use crate::models::{
    OwnershipRecord, RegistrationRequest, RequestStatus, TransferStatus, Vehicle, VehicleStatus,
    VehicleTransfer,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    vehicles: BTreeMap<i64, Vehicle>,
    requests: BTreeMap<i64, RegistrationRequest>,
    transfers: BTreeMap<i64, VehicleTransfer>,
    history: Vec<OwnershipRecord>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn vehicle(&self, id: i64) -> StoreResult<&Vehicle> {
        self.vehicles
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Vehicle {}", id)))
    }

    fn number_taken(&self, number: &str, excluding: Option<i64>) -> bool {
        self.vehicles.values().any(|v| {
            Some(v.id) != excluding && v.registration_number.eq_ignore_ascii_case(number)
        })
    }

    fn pending_registration(&self, vehicle_id: i64) -> bool {
        self.requests
            .values()
            .any(|r| r.vehicle_id == vehicle_id && r.is_pending())
    }

    fn pending_transfer(&self, vehicle_id: i64) -> bool {
        self.transfers
            .values()
            .any(|t| t.vehicle_id == vehicle_id && t.is_pending())
    }

    fn open_history(&mut self, vehicle_id: i64, owner_id: &str, owner_name: &str, now: DateTime<Utc>) {
        let id = self.next_id();
        self.history.push(OwnershipRecord {
            id,
            vehicle_id,
            owner_id: owner_id.to_string(),
            owner_name: owner_name.to_string(),
            from_date: now,
            to_date: None,
        });
    }

    fn pending_request(&self, id: i64) -> StoreResult<RegistrationRequest> {
        let request = self
            .requests
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Registration request {}", id)))?;
        if !request.is_pending() {
            return Err(StoreError::NotPending("registration requests".to_string()));
        }
        Ok(request.clone())
    }

    fn pending_transfer_by_id(&self, id: i64) -> StoreResult<VehicleTransfer> {
        let transfer = self
            .transfers
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Transfer {}", id)))?;
        if !transfer.is_pending() {
            return Err(StoreError::NotPending("transfers".to_string()));
        }
        Ok(transfer.clone())
    }
}

#[derive(Default)]
pub struct MemoryVehicleStore {
    tables: Mutex<Tables>,
}

impl MemoryVehicleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Importa un vehículo tal cual (estado y vencimiento incluidos) y abre
    /// su intervalo de propiedad. Pensado para fixtures.
    pub async fn import_vehicle(&self, mut vehicle: Vehicle) -> Vehicle {
        let mut tables = self.tables.lock().await;
        vehicle.id = tables.next_id();
        tables.open_history(vehicle.id, &vehicle.owner_id, &vehicle.owner_name, vehicle.created_at);
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        vehicle
    }
}

#[async_trait]
impl VehicleStore for MemoryVehicleStore {
    async fn create_vehicle(&self, new: NewVehicle, now: DateTime<Utc>) -> StoreResult<Vehicle> {
        let mut tables = self.tables.lock().await;
        if tables.number_taken(&new.registration_number, None) {
            return Err(StoreError::RegistrationNumberTaken(new.registration_number));
        }

        let vehicle = Vehicle {
            id: tables.next_id(),
            registration_number: new.registration_number,
            make: new.make,
            model: new.model,
            year: new.year,
            owner_id: new.owner_id,
            owner_name: new.owner_name,
            status: VehicleStatus::Unregistered,
            expiration_date: None,
            created_at: now,
        };
        tables.open_history(vehicle.id, &vehicle.owner_id, &vehicle.owner_name, now);
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn find_vehicle(&self, id: i64) -> StoreResult<Option<Vehicle>> {
        Ok(self.tables.lock().await.vehicles.get(&id).cloned())
    }

    async fn registration_number_exists(
        &self,
        registration_number: &str,
        excluding: Option<i64>,
    ) -> StoreResult<bool> {
        Ok(self.tables.lock().await.number_taken(registration_number, excluding))
    }

    async fn has_pending_registration(&self, vehicle_id: i64) -> StoreResult<bool> {
        Ok(self.tables.lock().await.pending_registration(vehicle_id))
    }

    async fn has_pending_transfer(&self, vehicle_id: i64) -> StoreResult<bool> {
        Ok(self.tables.lock().await.pending_transfer(vehicle_id))
    }

    async fn vehicles_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Vehicle>> {
        let tables = self.tables.lock().await;
        let mut vehicles: Vec<Vehicle> = tables
            .vehicles
            .values()
            .filter(|v| v.status == VehicleStatus::Registered)
            .filter(|v| matches!(v.expiration_date, Some(exp) if exp > from && exp <= to))
            .cloned()
            .collect();
        vehicles.sort_by_key(|v| v.expiration_date);
        Ok(vehicles)
    }

    async fn ownership_history(&self, vehicle_id: i64) -> StoreResult<Vec<OwnershipRecord>> {
        let tables = self.tables.lock().await;
        tables.vehicle(vehicle_id)?;
        Ok(tables
            .history
            .iter()
            .rev()
            .filter(|h| h.vehicle_id == vehicle_id)
            .cloned()
            .collect())
    }

    async fn insert_registration_request(
        &self,
        new: NewRegistrationRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<RegistrationRequest> {
        let mut tables = self.tables.lock().await;
        let vehicle = tables.vehicle(new.vehicle_id)?;
        check_submission_state(vehicle, new.request_type)?;
        if tables.pending_registration(new.vehicle_id) {
            return Err(StoreError::PendingRegistrationExists);
        }

        let request = RegistrationRequest {
            id: tables.next_id(),
            vehicle_id: new.vehicle_id,
            user_id: new.user_id,
            request_type: new.request_type,
            status: RequestStatus::Pending,
            period_months: new.period_months,
            technical_inspection_date: new.technical_inspection_date,
            insurance_doc_path: new.insurance_doc_path,
            inspection_doc_path: new.inspection_doc_path,
            identity_doc_path: new.identity_doc_path,
            created_at: now,
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
        };
        tables.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_registration_request(&self, id: i64) -> StoreResult<Option<RegistrationRequest>> {
        Ok(self.tables.lock().await.requests.get(&id).cloned())
    }

    async fn list_registration_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> StoreResult<Vec<RegistrationRequest>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .requests
            .values()
            .rev()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    async fn list_registration_requests_by_user(
        &self,
        user_id: &str,
    ) -> StoreResult<Vec<RegistrationRequest>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .requests
            .values()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn approve_registration(
        &self,
        request_id: i64,
        reviewer: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<(RegistrationRequest, Vehicle)> {
        let mut tables = self.tables.lock().await;
        let mut request = tables.pending_request(request_id)?;
        let vehicle = approved_vehicle(tables.vehicle(request.vehicle_id)?, &request, now)?;

        request.status = RequestStatus::Approved;
        request.reviewed_at = Some(now);
        request.reviewed_by = Some(reviewer.to_string());

        tables.requests.insert(request.id, request.clone());
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok((request, vehicle))
    }

    async fn reject_registration(
        &self,
        request_id: i64,
        reviewer: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<RegistrationRequest> {
        let mut tables = self.tables.lock().await;
        let mut request = tables.pending_request(request_id)?;

        request.status = RequestStatus::Rejected;
        request.reviewed_at = Some(now);
        request.reviewed_by = Some(reviewer.to_string());
        request.rejection_reason = Some(reason.to_string());

        tables.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn insert_transfer(
        &self,
        vehicle_id: i64,
        from_user_id: &str,
        to_user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<VehicleTransfer> {
        let mut tables = self.tables.lock().await;
        let vehicle = tables.vehicle(vehicle_id)?;
        if vehicle.status.is_terminal() {
            return Err(StoreError::InvalidTransition(format!(
                "vehicle {} is deregistered",
                vehicle.registration_number
            )));
        }
        if !vehicle.is_owned_by(from_user_id) {
            return Err(StoreError::InvalidTransition("ownership changed".to_string()));
        }
        if tables.pending_transfer(vehicle_id) {
            return Err(StoreError::PendingTransferExists);
        }

        let transfer = VehicleTransfer {
            id: tables.next_id(),
            vehicle_id,
            from_user_id: from_user_id.to_string(),
            to_user_id: to_user_id.to_string(),
            status: TransferStatus::Pending,
            created_at: now,
            responded_at: None,
        };
        tables.transfers.insert(transfer.id, transfer.clone());
        Ok(transfer)
    }

    async fn find_transfer(&self, id: i64) -> StoreResult<Option<VehicleTransfer>> {
        Ok(self.tables.lock().await.transfers.get(&id).cloned())
    }

    async fn list_transfers_for_user(&self, user_id: &str) -> StoreResult<Vec<VehicleTransfer>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .transfers
            .values()
            .rev()
            .filter(|t| t.involves(user_id))
            .cloned()
            .collect())
    }

    async fn list_pending_transfers_for_recipient(
        &self,
        user_id: &str,
    ) -> StoreResult<Vec<VehicleTransfer>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .transfers
            .values()
            .rev()
            .filter(|t| t.to_user_id == user_id && t.is_pending())
            .cloned()
            .collect())
    }

    async fn accept_transfer(
        &self,
        transfer_id: i64,
        new_owner_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<(VehicleTransfer, Vehicle)> {
        let mut tables = self.tables.lock().await;
        let mut transfer = tables.pending_transfer_by_id(transfer_id)?;
        let mut vehicle = tables.vehicle(transfer.vehicle_id)?.clone();
        if vehicle.status.is_terminal() {
            return Err(StoreError::InvalidTransition(format!(
                "vehicle {} is deregistered",
                vehicle.registration_number
            )));
        }
        if !vehicle.is_owned_by(&transfer.from_user_id) {
            return Err(StoreError::InvalidTransition("ownership changed".to_string()));
        }

        for record in tables
            .history
            .iter_mut()
            .filter(|h| h.vehicle_id == vehicle.id && h.is_open())
        {
            record.to_date = Some(now);
        }
        tables.open_history(vehicle.id, &transfer.to_user_id, new_owner_name, now);

        vehicle.owner_id = transfer.to_user_id.clone();
        vehicle.owner_name = new_owner_name.to_string();
        transfer.status = TransferStatus::Accepted;
        transfer.responded_at = Some(now);

        tables.vehicles.insert(vehicle.id, vehicle.clone());
        tables.transfers.insert(transfer.id, transfer.clone());
        Ok((transfer, vehicle))
    }

    async fn reject_transfer(&self, transfer_id: i64, now: DateTime<Utc>) -> StoreResult<VehicleTransfer> {
        let mut tables = self.tables.lock().await;
        let mut transfer = tables.pending_transfer_by_id(transfer_id)?;
        transfer.status = TransferStatus::Rejected;
        transfer.responded_at = Some(now);
        tables.transfers.insert(transfer.id, transfer.clone());
        Ok(transfer)
    }

    async fn deregister_vehicle(&self, vehicle_id: i64) -> StoreResult<Vehicle> {
        let mut tables = self.tables.lock().await;
        let mut vehicle = tables.vehicle(vehicle_id)?.clone();
        if vehicle.status.is_terminal() {
            return Err(StoreError::InvalidTransition(format!(
                "vehicle {} is already deregistered",
                vehicle.registration_number
            )));
        }
        vehicle.status = VehicleStatus::Deregistered;
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn change_registration_number(
        &self,
        vehicle_id: i64,
        new_registration_number: &str,
    ) -> StoreResult<Vehicle> {
        let mut tables = self.tables.lock().await;
        let mut vehicle = tables.vehicle(vehicle_id)?.clone();
        if vehicle.status != VehicleStatus::Registered {
            return Err(StoreError::InvalidTransition(format!(
                "vehicle {} is {}",
                vehicle.registration_number, vehicle.status
            )));
        }
        if tables.number_taken(new_registration_number, Some(vehicle_id)) {
            return Err(StoreError::RegistrationNumberTaken(new_registration_number.to_string()));
        }
        vehicle.registration_number = new_registration_number.to_string();
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestType;

    fn new_vehicle(number: &str) -> NewVehicle {
        NewVehicle {
            registration_number: number.to_string(),
            make: "Lada".to_string(),
            model: "Niva".to_string(),
            year: 2015,
            owner_id: "a".to_string(),
            owner_name: "Ana".to_string(),
        }
    }

    fn new_request(vehicle_id: i64) -> NewRegistrationRequest {
        NewRegistrationRequest {
            vehicle_id,
            user_id: "a".to_string(),
            request_type: RequestType::New,
            period_months: 12,
            technical_inspection_date: Utc::now().date_naive(),
            insurance_doc_path: None,
            inspection_doc_path: None,
            identity_doc_path: None,
        }
    }

    #[tokio::test]
    async fn test_create_vehicle_opens_history_and_enforces_unique_number() {
        let store = MemoryVehicleStore::new();
        let vehicle = store.create_vehicle(new_vehicle("NI-100-AA"), Utc::now()).await.unwrap();

        let history = store.ownership_history(vehicle.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_open());

        let duplicate = store.create_vehicle(new_vehicle("ni-100-aa"), Utc::now()).await;
        assert!(matches!(duplicate, Err(StoreError::RegistrationNumberTaken(_))));
    }

    #[tokio::test]
    async fn test_second_pending_request_is_refused() {
        let store = MemoryVehicleStore::new();
        let vehicle = store.create_vehicle(new_vehicle("NI-101-AA"), Utc::now()).await.unwrap();

        store.insert_registration_request(new_request(vehicle.id), Utc::now()).await.unwrap();
        let second = store.insert_registration_request(new_request(vehicle.id), Utc::now()).await;
        assert!(matches!(second, Err(StoreError::PendingRegistrationExists)));
        assert_eq!(store.list_registration_requests(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reviewed_request_cannot_be_reviewed_again() {
        let store = MemoryVehicleStore::new();
        let vehicle = store.create_vehicle(new_vehicle("NI-102-AA"), Utc::now()).await.unwrap();
        let request = store.insert_registration_request(new_request(vehicle.id), Utc::now()).await.unwrap();

        store.reject_registration(request.id, "admin", "blurry scan", Utc::now()).await.unwrap();
        let again = store.approve_registration(request.id, "admin", Utc::now()).await;
        assert!(matches!(again, Err(StoreError::NotPending(_))));

        let unchanged = store.find_vehicle(vehicle.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, VehicleStatus::Unregistered);
    }

    #[tokio::test]
    async fn test_deregister_is_terminal() {
        let store = MemoryVehicleStore::new();
        let vehicle = store.create_vehicle(new_vehicle("NI-103-AA"), Utc::now()).await.unwrap();
        store.deregister_vehicle(vehicle.id).await.unwrap();
        assert!(matches!(
            store.deregister_vehicle(vehicle.id).await,
            Err(StoreError::InvalidTransition(_))
        ));
        assert!(matches!(
            store.insert_transfer(vehicle.id, "a", "b", Utc::now()).await,
            Err(StoreError::InvalidTransition(_))
        ));
    }
}
