//! Implementación PostgreSQL de `VehicleStore`
//!
//! Cada operación de flujo abre una transacción, bloquea las filas que
//! va a tocar (`FOR UPDATE`) y vuelve a validar antes de escribir. Los índices
//! únicos parciales son el árbitro final ante escrituras concurrentes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::vehicle_store::{
    approved_vehicle, check_submission_state, NewRegistrationRequest, NewVehicle, StoreError,
    StoreResult, VehicleStore,
};
use crate::models::{
    OwnershipRecord, RegistrationRequest, RequestStatus, RequestType, TransferStatus, Vehicle,
    VehicleStatus, VehicleTransfer,
};

const VEHICLE_COLUMNS: &str = "id, registration_number, make, model, year, owner_id, owner_name, \
     status, expiration_date, created_at";

const REQUEST_COLUMNS: &str = "id, vehicle_id, user_id, request_type, status, period_months, \
     technical_inspection_date, insurance_doc_path, inspection_doc_path, identity_doc_path, \
     created_at, reviewed_at, reviewed_by, rejection_reason";

const TRANSFER_COLUMNS: &str =
    "id, vehicle_id, from_user_id, to_user_id, status, created_at, responded_at";

#[derive(Debug, FromRow)]
struct VehicleRow {
    id: i64,
    registration_number: String,
    make: String,
    model: String,
    year: i32,
    owner_id: String,
    owner_name: String,
    status: String,
    expiration_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<VehicleRow> for Vehicle {
    type Error = StoreError;

    fn try_from(row: VehicleRow) -> Result<Self, Self::Error> {
        let status = VehicleStatus::from_str(&row.status).ok_or_else(|| {
            StoreError::Corrupt(format!("vehicle {} has status '{}'", row.id, row.status))
        })?;
        Ok(Vehicle {
            id: row.id,
            registration_number: row.registration_number,
            make: row.make,
            model: row.model,
            year: row.year,
            owner_id: row.owner_id,
            owner_name: row.owner_name,
            status,
            expiration_date: row.expiration_date,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RequestRow {
    id: i64,
    vehicle_id: i64,
    user_id: String,
    request_type: String,
    status: String,
    period_months: i32,
    technical_inspection_date: NaiveDate,
    insurance_doc_path: Option<String>,
    inspection_doc_path: Option<String>,
    identity_doc_path: Option<String>,
    created_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<String>,
    rejection_reason: Option<String>,
}

impl TryFrom<RequestRow> for RegistrationRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let request_type = RequestType::from_str(&row.request_type).ok_or_else(|| {
            StoreError::Corrupt(format!("request {} has type '{}'", row.id, row.request_type))
        })?;
        let status = RequestStatus::from_str(&row.status).ok_or_else(|| {
            StoreError::Corrupt(format!("request {} has status '{}'", row.id, row.status))
        })?;
        Ok(RegistrationRequest {
            id: row.id,
            vehicle_id: row.vehicle_id,
            user_id: row.user_id,
            request_type,
            status,
            period_months: row.period_months,
            technical_inspection_date: row.technical_inspection_date,
            insurance_doc_path: row.insurance_doc_path,
            inspection_doc_path: row.inspection_doc_path,
            identity_doc_path: row.identity_doc_path,
            created_at: row.created_at,
            reviewed_at: row.reviewed_at,
            reviewed_by: row.reviewed_by,
            rejection_reason: row.rejection_reason,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransferRow {
    id: i64,
    vehicle_id: i64,
    from_user_id: String,
    to_user_id: String,
    status: String,
    created_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransferRow> for VehicleTransfer {
    type Error = StoreError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        let status = TransferStatus::from_str(&row.status).ok_or_else(|| {
            StoreError::Corrupt(format!("transfer {} has status '{}'", row.id, row.status))
        })?;
        Ok(VehicleTransfer {
            id: row.id,
            vehicle_id: row.vehicle_id,
            from_user_id: row.from_user_id,
            to_user_id: row.to_user_id,
            status,
            created_at: row.created_at,
            responded_at: row.responded_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: i64,
    vehicle_id: i64,
    owner_id: String,
    owner_name: String,
    from_date: DateTime<Utc>,
    to_date: Option<DateTime<Utc>>,
}

impl From<HistoryRow> for OwnershipRecord {
    fn from(row: HistoryRow) -> Self {
        OwnershipRecord {
            id: row.id,
            vehicle_id: row.vehicle_id,
            owner_id: row.owner_id,
            owner_name: row.owner_name,
            from_date: row.from_date,
            to_date: row.to_date,
        }
    }
}

fn collect<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Traduce violaciones de índices únicos al error de negocio equivalente
fn translate_unique(err: sqlx::Error, registration_number: Option<&str>) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            match db_err.constraint() {
                Some("registration_requests_one_pending") => {
                    return StoreError::PendingRegistrationExists
                }
                Some("vehicle_transfers_one_pending") => return StoreError::PendingTransferExists,
                Some("vehicles_registration_number_key") => {
                    return StoreError::RegistrationNumberTaken(
                        registration_number.unwrap_or_default().to_string(),
                    )
                }
                Some("vehicle_ownership_history_one_open") => {
                    return StoreError::InvalidTransition(
                        "ownership history already has an open interval".to_string(),
                    )
                }
                _ => {}
            }
        }
    }
    StoreError::Database(err)
}

pub struct PgVehicleStore {
    pool: PgPool,
}

impl PgVehicleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ejecutar migraciones pendientes (`migrations/`)
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn lock_vehicle(tx: &mut Transaction<'_, Postgres>, id: i64) -> StoreResult<Vehicle> {
        let row = sqlx::query_as::<_, VehicleRow>(&format!(
            "SELECT {} FROM vehicles WHERE id = $1 FOR UPDATE",
            VEHICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Vehicle {}", id)))?;
        row.try_into()
    }

    async fn lock_pending_request(
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> StoreResult<RegistrationRequest> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {} FROM registration_requests WHERE id = $1 FOR UPDATE",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Registration request {}", id)))?;
        let request: RegistrationRequest = row.try_into()?;
        if !request.is_pending() {
            return Err(StoreError::NotPending("registration requests".to_string()));
        }
        Ok(request)
    }

    async fn lock_pending_transfer(
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> StoreResult<VehicleTransfer> {
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {} FROM vehicle_transfers WHERE id = $1 FOR UPDATE",
            TRANSFER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Transfer {}", id)))?;
        let transfer: VehicleTransfer = row.try_into()?;
        if !transfer.is_pending() {
            return Err(StoreError::NotPending("transfers".to_string()));
        }
        Ok(transfer)
    }

    async fn update_vehicle(tx: &mut Transaction<'_, Postgres>, vehicle: &Vehicle) -> StoreResult<Vehicle> {
        let row = sqlx::query_as::<_, VehicleRow>(&format!(
            r#"
            UPDATE vehicles
            SET registration_number = $2, owner_id = $3, owner_name = $4, status = $5, expiration_date = $6
            WHERE id = $1
            RETURNING {}
            "#,
            VEHICLE_COLUMNS
        ))
        .bind(vehicle.id)
        .bind(&vehicle.registration_number)
        .bind(&vehicle.owner_id)
        .bind(&vehicle.owner_name)
        .bind(vehicle.status.as_str())
        .bind(vehicle.expiration_date)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| translate_unique(e, Some(&vehicle.registration_number)))?;
        row.try_into()
    }

    async fn open_history(
        tx: &mut Transaction<'_, Postgres>,
        vehicle_id: i64,
        owner_id: &str,
        owner_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO vehicle_ownership_history (vehicle_id, owner_id, owner_name, from_date)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(vehicle_id)
        .bind(owner_id)
        .bind(owner_name)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(|e| translate_unique(e, None))?;
        Ok(())
    }
}

#[async_trait]
impl VehicleStore for PgVehicleStore {
    async fn create_vehicle(&self, new: NewVehicle, now: DateTime<Utc>) -> StoreResult<Vehicle> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, VehicleRow>(&format!(
            r#"
            INSERT INTO vehicles (registration_number, make, model, year, owner_id, owner_name, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            VEHICLE_COLUMNS
        ))
        .bind(&new.registration_number)
        .bind(&new.make)
        .bind(&new.model)
        .bind(new.year)
        .bind(&new.owner_id)
        .bind(&new.owner_name)
        .bind(VehicleStatus::Unregistered.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| translate_unique(e, Some(&new.registration_number)))?;
        let vehicle: Vehicle = row.try_into()?;

        Self::open_history(&mut tx, vehicle.id, &vehicle.owner_id, &vehicle.owner_name, now).await?;
        tx.commit().await?;
        Ok(vehicle)
    }

    async fn find_vehicle(&self, id: i64) -> StoreResult<Option<Vehicle>> {
        sqlx::query_as::<_, VehicleRow>(&format!(
            "SELECT {} FROM vehicles WHERE id = $1",
            VEHICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Vehicle::try_from)
        .transpose()
    }

    async fn registration_number_exists(
        &self,
        registration_number: &str,
        excluding: Option<i64>,
    ) -> StoreResult<bool> {
        let result: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM vehicles
                WHERE UPPER(registration_number) = UPPER($1)
                AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(registration_number)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;
        Ok(result.0)
    }

    async fn has_pending_registration(&self, vehicle_id: i64) -> StoreResult<bool> {
        let result: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM registration_requests WHERE vehicle_id = $1 AND status = 'pending')",
        )
        .bind(vehicle_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(result.0)
    }

    async fn has_pending_transfer(&self, vehicle_id: i64) -> StoreResult<bool> {
        let result: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM vehicle_transfers WHERE vehicle_id = $1 AND status = 'pending')",
        )
        .bind(vehicle_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(result.0)
    }

    async fn vehicles_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Vehicle>> {
        let rows = sqlx::query_as::<_, VehicleRow>(&format!(
            r#"
            SELECT {} FROM vehicles
            WHERE status IN ('registered', 'active')
            AND expiration_date > $1 AND expiration_date <= $2
            ORDER BY expiration_date
            "#,
            VEHICLE_COLUMNS
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn ownership_history(&self, vehicle_id: i64) -> StoreResult<Vec<OwnershipRecord>> {
        if self.find_vehicle(vehicle_id).await?.is_none() {
            return Err(StoreError::NotFound(format!("Vehicle {}", vehicle_id)));
        }
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, vehicle_id, owner_id, owner_name, from_date, to_date
            FROM vehicle_ownership_history
            WHERE vehicle_id = $1
            ORDER BY from_date DESC, id DESC
            "#,
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(OwnershipRecord::from).collect())
    }

    async fn insert_registration_request(
        &self,
        new: NewRegistrationRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<RegistrationRequest> {
        let mut tx = self.pool.begin().await?;
        let vehicle = Self::lock_vehicle(&mut tx, new.vehicle_id).await?;
        check_submission_state(&vehicle, new.request_type)?;

        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            INSERT INTO registration_requests
                (vehicle_id, user_id, request_type, status, period_months, technical_inspection_date,
                 insurance_doc_path, inspection_doc_path, identity_doc_path, created_at)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(new.vehicle_id)
        .bind(&new.user_id)
        .bind(new.request_type.as_str())
        .bind(new.period_months)
        .bind(new.technical_inspection_date)
        .bind(&new.insurance_doc_path)
        .bind(&new.inspection_doc_path)
        .bind(&new.identity_doc_path)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| translate_unique(e, None))?;

        tx.commit().await?;
        row.try_into()
    }

    async fn find_registration_request(&self, id: i64) -> StoreResult<Option<RegistrationRequest>> {
        sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {} FROM registration_requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(RegistrationRequest::try_from)
        .transpose()
    }

    async fn list_registration_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> StoreResult<Vec<RegistrationRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            SELECT {} FROM registration_requests
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            "#,
            REQUEST_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn list_registration_requests_by_user(
        &self,
        user_id: &str,
    ) -> StoreResult<Vec<RegistrationRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {} FROM registration_requests WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            REQUEST_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn approve_registration(
        &self,
        request_id: i64,
        reviewer: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<(RegistrationRequest, Vehicle)> {
        let mut tx = self.pool.begin().await?;
        let request = Self::lock_pending_request(&mut tx, request_id).await?;
        let vehicle = Self::lock_vehicle(&mut tx, request.vehicle_id).await?;
        let vehicle = approved_vehicle(&vehicle, &request, now)?;
        let vehicle = Self::update_vehicle(&mut tx, &vehicle).await?;

        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            UPDATE registration_requests
            SET status = 'approved', reviewed_at = $2, reviewed_by = $3
            WHERE id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(now)
        .bind(reviewer)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((row.try_into()?, vehicle))
    }

    async fn reject_registration(
        &self,
        request_id: i64,
        reviewer: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<RegistrationRequest> {
        let mut tx = self.pool.begin().await?;
        Self::lock_pending_request(&mut tx, request_id).await?;

        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            UPDATE registration_requests
            SET status = 'rejected', reviewed_at = $2, reviewed_by = $3, rejection_reason = $4
            WHERE id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(now)
        .bind(reviewer)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn insert_transfer(
        &self,
        vehicle_id: i64,
        from_user_id: &str,
        to_user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<VehicleTransfer> {
        let mut tx = self.pool.begin().await?;
        let vehicle = Self::lock_vehicle(&mut tx, vehicle_id).await?;
        if vehicle.status.is_terminal() {
            return Err(StoreError::InvalidTransition(format!(
                "vehicle {} is deregistered",
                vehicle.registration_number
            )));
        }
        if !vehicle.is_owned_by(from_user_id) {
            return Err(StoreError::InvalidTransition("ownership changed".to_string()));
        }

        let row = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            INSERT INTO vehicle_transfers (vehicle_id, from_user_id, to_user_id, status, created_at)
            VALUES ($1, $2, $3, 'pending', $4)
            RETURNING {}
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(vehicle_id)
        .bind(from_user_id)
        .bind(to_user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| translate_unique(e, None))?;

        tx.commit().await?;
        row.try_into()
    }

    async fn find_transfer(&self, id: i64) -> StoreResult<Option<VehicleTransfer>> {
        sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {} FROM vehicle_transfers WHERE id = $1",
            TRANSFER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(VehicleTransfer::try_from)
        .transpose()
    }

    async fn list_transfers_for_user(&self, user_id: &str) -> StoreResult<Vec<VehicleTransfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            SELECT {} FROM vehicle_transfers
            WHERE from_user_id = $1 OR to_user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn list_pending_transfers_for_recipient(
        &self,
        user_id: &str,
    ) -> StoreResult<Vec<VehicleTransfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            SELECT {} FROM vehicle_transfers
            WHERE to_user_id = $1 AND status = 'pending'
            ORDER BY created_at DESC, id DESC
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn accept_transfer(
        &self,
        transfer_id: i64,
        new_owner_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<(VehicleTransfer, Vehicle)> {
        let mut tx = self.pool.begin().await?;
        let transfer = Self::lock_pending_transfer(&mut tx, transfer_id).await?;
        let mut vehicle = Self::lock_vehicle(&mut tx, transfer.vehicle_id).await?;
        if vehicle.status.is_terminal() {
            return Err(StoreError::InvalidTransition(format!(
                "vehicle {} is deregistered",
                vehicle.registration_number
            )));
        }
        if !vehicle.is_owned_by(&transfer.from_user_id) {
            return Err(StoreError::InvalidTransition("ownership changed".to_string()));
        }

        sqlx::query(
            "UPDATE vehicle_ownership_history SET to_date = $2 WHERE vehicle_id = $1 AND to_date IS NULL",
        )
        .bind(vehicle.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        Self::open_history(&mut tx, vehicle.id, &transfer.to_user_id, new_owner_name, now).await?;

        vehicle.owner_id = transfer.to_user_id.clone();
        vehicle.owner_name = new_owner_name.to_string();
        let vehicle = Self::update_vehicle(&mut tx, &vehicle).await?;

        let row = sqlx::query_as::<_, TransferRow>(&format!(
            "UPDATE vehicle_transfers SET status = 'accepted', responded_at = $2 WHERE id = $1 RETURNING {}",
            TRANSFER_COLUMNS
        ))
        .bind(transfer_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((row.try_into()?, vehicle))
    }

    async fn reject_transfer(&self, transfer_id: i64, now: DateTime<Utc>) -> StoreResult<VehicleTransfer> {
        let mut tx = self.pool.begin().await?;
        Self::lock_pending_transfer(&mut tx, transfer_id).await?;

        let row = sqlx::query_as::<_, TransferRow>(&format!(
            "UPDATE vehicle_transfers SET status = 'rejected', responded_at = $2 WHERE id = $1 RETURNING {}",
            TRANSFER_COLUMNS
        ))
        .bind(transfer_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn deregister_vehicle(&self, vehicle_id: i64) -> StoreResult<Vehicle> {
        let mut tx = self.pool.begin().await?;
        let mut vehicle = Self::lock_vehicle(&mut tx, vehicle_id).await?;
        if vehicle.status.is_terminal() {
            return Err(StoreError::InvalidTransition(format!(
                "vehicle {} is already deregistered",
                vehicle.registration_number
            )));
        }
        vehicle.status = VehicleStatus::Deregistered;
        let vehicle = Self::update_vehicle(&mut tx, &vehicle).await?;
        tx.commit().await?;
        Ok(vehicle)
    }

    async fn change_registration_number(
        &self,
        vehicle_id: i64,
        new_registration_number: &str,
    ) -> StoreResult<Vehicle> {
        let mut tx = self.pool.begin().await?;
        let mut vehicle = Self::lock_vehicle(&mut tx, vehicle_id).await?;
        if vehicle.status != VehicleStatus::Registered {
            return Err(StoreError::InvalidTransition(format!(
                "vehicle {} is {}",
                vehicle.registration_number, vehicle.status
            )));
        }
        vehicle.registration_number = new_registration_number.to_string();
        let vehicle = Self::update_vehicle(&mut tx, &vehicle).await?;
        tx.commit().await?;
        Ok(vehicle)
    }
}
