//! Servicio de ciclo de vida de vehículos
//!
//! Orquesta solicitudes de registro, transferencias de propiedad, bajas y
//! cambios de matrícula. Orden fijo en cada operación:
//!
//! 1. autorización y precondiciones locales (motor de reglas, lista completa)
//! 2. control de multas, si la operación lo exige
//! 3. commit en el store (una transacción que re-valida)
//! 4. notificaciones best-effort, ya fuera de la transacción

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};

use super::document_storage::{decode_document, DecodedDocument, DocumentStorage};
use super::fines_gate::FinesGate;
use super::metrics;
use super::notifier::Notifier;
use super::validation_engine::{
    evaluate, DocumentKind, DocumentSet, Facts, PlateChangeInput, RegistrationInput, RuleContext,
    TargetUser, TransferInput, TransitionInput, Violation,
};
use crate::clients::IdentityGateway;
use crate::models::auth::AuthenticatedUser;
use crate::models::vehicle::DEFAULT_RENEWAL_MONTHS;
use crate::models::{
    OwnershipRecord, RegistrationRequest, RequestStatus, RequestType, Vehicle, VehicleTransfer,
};
use crate::repositories::vehicle_store::{NewRegistrationRequest, NewVehicle, VehicleStore};
use crate::utils::errors::{forbidden_error, not_found_error, AppError, AppResult};
use crate::utils::validation::normalize_registration_number;

/// Adjunto tal como llega del cliente
#[derive(Debug, Clone, Default)]
pub struct DocumentUpload {
    pub file_name: Option<String>,
    pub content_base64: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubmitRegistration {
    pub vehicle_id: i64,
    pub request_type: RequestType,
    pub technical_inspection_date: NaiveDate,
    pub period_months: Option<u32>,
    pub insurance: Option<DocumentUpload>,
    pub inspection: Option<DocumentUpload>,
    pub identity: Option<DocumentUpload>,
}

#[derive(Debug, Clone)]
pub struct CreateVehicle {
    pub registration_number: String,
    pub make: String,
    pub model: String,
    pub year: i32,
}

#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn VehicleStore>,
    identity: Arc<dyn IdentityGateway>,
    fines: FinesGate,
    notifier: Notifier,
    documents: DocumentStorage,
    timeout: Duration,
}

impl LifecycleService {
    pub fn new(
        store: Arc<dyn VehicleStore>,
        identity: Arc<dyn IdentityGateway>,
        fines: FinesGate,
        notifier: Notifier,
        documents: DocumentStorage,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            identity,
            fines,
            notifier,
            documents,
            timeout,
        }
    }

    async fn load_vehicle(&self, vehicle_id: i64) -> AppResult<Vehicle> {
        self.store
            .find_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", vehicle_id))
    }

    fn reject_if_invalid(violations: Vec<Violation>) -> AppResult<()> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::from_violations(violations))
        }
    }

    // ── Vehículos ────────────────────────────────────────────────────────

    /// Alta de un vehículo sin registrar; el llamante pasa a ser propietario
    pub async fn create_vehicle(&self, command: CreateVehicle, caller: &AuthenticatedUser) -> AppResult<Vehicle> {
        let new = NewVehicle {
            registration_number: normalize_registration_number(&command.registration_number),
            make: command.make.trim().to_string(),
            model: command.model.trim().to_string(),
            year: command.year,
            owner_id: caller.user_id.clone(),
            owner_name: caller.display_name().to_string(),
        };

        let vehicle = self.store.create_vehicle(new, Utc::now()).await?;
        log::info!(
            "🚗 Vehicle {} ({}) created for user {}",
            vehicle.id,
            vehicle.registration_number,
            caller.user_id
        );
        Ok(vehicle)
    }

    /// Baja definitiva (propietario o administrador)
    pub async fn deregister(&self, vehicle_id: i64, caller: &AuthenticatedUser) -> AppResult<Vehicle> {
        let vehicle = self.load_vehicle(vehicle_id).await?;
        if !vehicle.is_owned_by(&caller.user_id) && !caller.is_admin() {
            return Err(forbidden_error("deregister vehicle", "you do not own this vehicle"));
        }
        if vehicle.status.is_terminal() {
            return Err(AppError::StateConflict(vec![Violation::state(
                "vehicle_deregistered",
                format!("Vehicle {} is already deregistered", vehicle.registration_number),
            )]));
        }

        let vehicle = self.store.deregister_vehicle(vehicle_id).await?;
        log::info!("🛑 Vehicle {} deregistered by {}", vehicle.registration_number, caller.user_id);
        Ok(vehicle)
    }

    /// Cambio de matrícula (solo propietario)
    pub async fn change_license_plate(
        &self,
        vehicle_id: i64,
        mut input: PlateChangeInput,
        caller: &AuthenticatedUser,
    ) -> AppResult<Vehicle> {
        let vehicle = self.load_vehicle(vehicle_id).await?;
        if !vehicle.is_owned_by(&caller.user_id) {
            return Err(forbidden_error("change license plate", "you do not own this vehicle"));
        }

        input.new_registration_number = normalize_registration_number(&input.new_registration_number);
        let registration_number_taken = !input.new_registration_number.is_empty()
            && self
                .store
                .registration_number_exists(&input.new_registration_number, Some(vehicle_id))
                .await?;

        let new_number = input.new_registration_number.clone();
        let reason = input.reason.trim().to_string();
        let transition = TransitionInput::PlateChange(input);
        let facts = Facts {
            registration_number_taken,
            ..Facts::default()
        };
        Self::reject_if_invalid(evaluate(&RuleContext {
            vehicle: &vehicle,
            input: &transition,
            facts,
            now: Utc::now(),
        }))?;

        let old_number = vehicle.registration_number.clone();
        let updated = self
            .store
            .change_registration_number(vehicle_id, &new_number)
            .await?;
        log::info!(
            "🔁 Vehicle {} plate changed {} -> {} ({})",
            vehicle_id,
            old_number,
            updated.registration_number,
            reason
        );

        self.notifier
            .notify(
                &updated.owner_id,
                "License plate changed",
                &format!(
                    "Your vehicle {} {} now carries registration number {} (previously {}).",
                    updated.make, updated.model, updated.registration_number, old_number
                ),
                caller.credential(),
            )
            .await;
        Ok(updated)
    }

    /// Historial de propietarios (propietario actual o administrador)
    pub async fn ownership_history(
        &self,
        vehicle_id: i64,
        caller: &AuthenticatedUser,
    ) -> AppResult<Vec<OwnershipRecord>> {
        let vehicle = self.load_vehicle(vehicle_id).await?;
        if !vehicle.is_owned_by(&caller.user_id) && !caller.is_admin() {
            return Err(forbidden_error("view ownership history", "you do not own this vehicle"));
        }
        Ok(self.store.ownership_history(vehicle_id).await?)
    }

    /// Vehículos registrados que vencen en los próximos `days` días (administradores)
    pub async fn expiring_vehicles(&self, days: i64, caller: &AuthenticatedUser) -> AppResult<Vec<Vehicle>> {
        if !caller.is_admin() {
            return Err(forbidden_error("list expiring vehicles", "reviewer role required"));
        }
        let now = Utc::now();
        Ok(self
            .store
            .vehicles_expiring_between(now, now + chrono::Duration::days(days))
            .await?)
    }

    // ── Solicitudes de registro ──────────────────────────────────────────

    pub async fn submit_registration(
        &self,
        command: SubmitRegistration,
        caller: &AuthenticatedUser,
    ) -> AppResult<RegistrationRequest> {
        let vehicle = self.load_vehicle(command.vehicle_id).await?;
        if !vehicle.is_owned_by(&caller.user_id) {
            return Err(forbidden_error(
                "submit registration request",
                "you can only submit requests for your own vehicles",
            ));
        }

        let mut documents = DocumentSet::default();
        let mut decoded: Vec<DecodedDocument> = Vec::new();
        for (kind, upload) in [
            (DocumentKind::Insurance, &command.insurance),
            (DocumentKind::Inspection, &command.inspection),
            (DocumentKind::Identity, &command.identity),
        ] {
            let upload = upload.as_ref();
            let (presence, document) = decode_document(
                kind,
                upload.and_then(|u| u.file_name.as_deref()),
                upload.and_then(|u| u.content_base64.as_deref()),
            );
            match kind {
                DocumentKind::Insurance => documents.insurance = presence,
                DocumentKind::Inspection => documents.inspection = presence,
                DocumentKind::Identity => documents.identity = presence,
            }
            decoded.extend(document);
        }

        let transition = TransitionInput::Registration(RegistrationInput {
            request_type: command.request_type,
            inspection_date: command.technical_inspection_date,
            period_months: command.period_months,
            documents,
        });
        let facts = Facts {
            has_pending_registration: self.store.has_pending_registration(vehicle.id).await?,
            ..Facts::default()
        };
        Self::reject_if_invalid(evaluate(&RuleContext {
            vehicle: &vehicle,
            input: &transition,
            facts,
            now: Utc::now(),
        }))?;

        self.fines
            .enforce(&vehicle.registration_number, caller.credential())
            .await?;

        let saved = self.documents.save_all(&decoded).await?;
        let path_of = |kind: DocumentKind| {
            saved
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|(_, path)| path.clone())
        };

        let period_months = match command.request_type {
            RequestType::Renewal => command.period_months.unwrap_or(DEFAULT_RENEWAL_MONTHS),
            RequestType::New => DEFAULT_RENEWAL_MONTHS,
        };
        let new = NewRegistrationRequest {
            vehicle_id: vehicle.id,
            user_id: caller.user_id.clone(),
            request_type: command.request_type,
            period_months: i32::try_from(period_months)
                .map_err(|_| AppError::BadRequest("Invalid renewal period".to_string()))?,
            technical_inspection_date: command.technical_inspection_date,
            insurance_doc_path: path_of(DocumentKind::Insurance),
            inspection_doc_path: path_of(DocumentKind::Inspection),
            identity_doc_path: path_of(DocumentKind::Identity),
        };

        match self.store.insert_registration_request(new, Utc::now()).await {
            Ok(request) => {
                log::info!(
                    "📝 {} request {} submitted for vehicle {} by {}",
                    request.request_type.as_str(),
                    request.id,
                    vehicle.registration_number,
                    caller.user_id
                );
                Ok(request)
            }
            Err(e) => {
                let paths: Vec<String> = saved.into_iter().map(|(_, p)| p).collect();
                self.documents.remove_all(&paths).await;
                Err(e.into())
            }
        }
    }

    /// Revisión (solo administradores): aprobar o rechazar con motivo
    pub async fn review_registration(
        &self,
        request_id: i64,
        approve: bool,
        rejection_reason: Option<&str>,
        reviewer: &AuthenticatedUser,
    ) -> AppResult<RegistrationRequest> {
        if !reviewer.is_admin() {
            return Err(forbidden_error("review registration request", "reviewer role required"));
        }

        let request = self
            .store
            .find_registration_request(request_id)
            .await?
            .ok_or_else(|| not_found_error("Registration request", request_id))?;
        if !request.is_pending() {
            return Err(AppError::StateConflict(vec![Violation::not_pending(
                "registration requests",
            )]));
        }

        let reviewer_label = reviewer.display_name().to_string();

        if approve {
            let vehicle = self.load_vehicle(request.vehicle_id).await?;
            // las multas pueden haberse acumulado desde el envío
            self.fines
                .enforce(&vehicle.registration_number, reviewer.credential())
                .await?;

            let (request, vehicle) = self
                .store
                .approve_registration(request_id, &reviewer_label, Utc::now())
                .await?;
            log::info!(
                "✅ Request {} approved by {}; vehicle {} is {}",
                request.id,
                reviewer_label,
                vehicle.registration_number,
                vehicle.status
            );

            let expiration = vehicle
                .expiration_date
                .map(|d| format!(" Registration valid until {}.", d.format("%Y-%m-%d")))
                .unwrap_or_default();
            self.notifier
                .notify(
                    &request.user_id,
                    "Registration request approved",
                    &format!(
                        "Your {} registration request for vehicle {} has been approved.{}",
                        request.request_type.as_str(),
                        vehicle.registration_number,
                        expiration
                    ),
                    reviewer.credential(),
                )
                .await;
            Ok(request)
        } else {
            let reason = rejection_reason.map(str::trim).unwrap_or_default();
            if reason.is_empty() {
                return Err(AppError::ValidationFailed(vec![Violation::business(
                    "rejection_reason_required",
                    "Rejection reason is required when rejecting a request",
                )]));
            }

            let request = self
                .store
                .reject_registration(request_id, &reviewer_label, reason, Utc::now())
                .await?;
            log::info!("❌ Request {} rejected by {}: {}", request.id, reviewer_label, reason);

            self.notifier
                .notify(
                    &request.user_id,
                    "Registration request rejected",
                    &format!(
                        "Your {} registration request #{} has been rejected. Reason: {}",
                        request.request_type.as_str(),
                        request.id,
                        reason
                    ),
                    reviewer.credential(),
                )
                .await;
            Ok(request)
        }
    }

    pub async fn list_registration_requests(
        &self,
        status: Option<RequestStatus>,
        caller: &AuthenticatedUser,
    ) -> AppResult<Vec<RegistrationRequest>> {
        if !caller.is_admin() {
            return Err(forbidden_error("list registration requests", "reviewer role required"));
        }
        Ok(self.store.list_registration_requests(status).await?)
    }

    pub async fn my_registration_requests(&self, caller: &AuthenticatedUser) -> AppResult<Vec<RegistrationRequest>> {
        Ok(self
            .store
            .list_registration_requests_by_user(&caller.user_id)
            .await?)
    }

    pub async fn get_registration_request(
        &self,
        request_id: i64,
        caller: &AuthenticatedUser,
    ) -> AppResult<RegistrationRequest> {
        let request = self
            .store
            .find_registration_request(request_id)
            .await?
            .ok_or_else(|| not_found_error("Registration request", request_id))?;
        if request.user_id != caller.user_id && !caller.is_admin() {
            return Err(forbidden_error("view registration request", "not your request"));
        }
        Ok(request)
    }

    // ── Transferencias de propiedad ──────────────────────────────────────

    /// Consulta al servicio de identidad; si no responde se permite continuar
    async fn resolve_target(&self, user_id: &str, credential: Option<&str>) -> TargetUser {
        match tokio::time::timeout(self.timeout, self.identity.find_user(user_id, credential)).await {
            Ok(Ok(Some(user))) if user.is_active => TargetUser::Active,
            Ok(Ok(Some(_))) => TargetUser::Inactive,
            Ok(Ok(None)) => TargetUser::Missing,
            Ok(Err(e)) => {
                log::warn!("⚠️ Could not verify transfer target {}: {} (continuing)", user_id, e);
                metrics::gateway_failure("identity");
                TargetUser::Unknown
            }
            Err(_) => {
                log::warn!("⚠️ Verifying transfer target {} timed out (continuing)", user_id);
                metrics::gateway_failure("identity");
                TargetUser::Unknown
            }
        }
    }

    pub async fn create_transfer(
        &self,
        vehicle_id: i64,
        target_user_id: &str,
        caller: &AuthenticatedUser,
    ) -> AppResult<VehicleTransfer> {
        let vehicle = self.load_vehicle(vehicle_id).await?;
        if !vehicle.is_owned_by(&caller.user_id) {
            return Err(forbidden_error("transfer vehicle", "only the current owner can transfer it"));
        }

        let target = target_user_id.trim();
        let target_user = if target.is_empty() || target == caller.user_id {
            TargetUser::Unknown
        } else {
            self.resolve_target(target, caller.credential()).await
        };

        let transition = TransitionInput::Transfer(TransferInput {
            caller_id: caller.user_id.clone(),
            target_user_id: target.to_string(),
        });
        let facts = Facts {
            has_pending_transfer: self.store.has_pending_transfer(vehicle_id).await?,
            target_user,
            ..Facts::default()
        };
        Self::reject_if_invalid(evaluate(&RuleContext {
            vehicle: &vehicle,
            input: &transition,
            facts,
            now: Utc::now(),
        }))?;

        let transfer = self
            .store
            .insert_transfer(vehicle_id, &caller.user_id, target, Utc::now())
            .await?;
        log::info!(
            "🤝 Transfer {} created: vehicle {} from {} to {}",
            transfer.id,
            vehicle.registration_number,
            transfer.from_user_id,
            transfer.to_user_id
        );

        self.notifier
            .notify(
                &transfer.to_user_id,
                "Vehicle transfer request",
                &format!(
                    "{} wants to transfer vehicle {} {} ({}) to you. Open your pending transfers to respond.",
                    caller.display_name(),
                    vehicle.make,
                    vehicle.model,
                    vehicle.registration_number
                ),
                caller.credential(),
            )
            .await;
        Ok(transfer)
    }

    /// Respuesta del destinatario. Aceptar exige no tener multas pendientes.
    pub async fn respond_transfer(
        &self,
        transfer_id: i64,
        accept: bool,
        caller: &AuthenticatedUser,
    ) -> AppResult<VehicleTransfer> {
        let transfer = self
            .store
            .find_transfer(transfer_id)
            .await?
            .ok_or_else(|| not_found_error("Transfer", transfer_id))?;
        if transfer.to_user_id != caller.user_id {
            return Err(forbidden_error("respond to transfer", "only the recipient can respond"));
        }
        if !transfer.is_pending() {
            return Err(AppError::StateConflict(vec![Violation::not_pending("transfers")]));
        }

        let vehicle = self.load_vehicle(transfer.vehicle_id).await?;

        let (transfer, subject, verb) = if accept {
            self.fines
                .enforce(&vehicle.registration_number, caller.credential())
                .await?;
            let (transfer, updated) = self
                .store
                .accept_transfer(transfer_id, caller.display_name(), Utc::now())
                .await?;
            log::info!(
                "✅ Transfer {} accepted: vehicle {} now owned by {}",
                transfer.id,
                updated.registration_number,
                updated.owner_id
            );
            (transfer, "Vehicle transfer accepted", "accepted")
        } else {
            let transfer = self.store.reject_transfer(transfer_id, Utc::now()).await?;
            log::info!("❌ Transfer {} rejected by {}", transfer.id, caller.user_id);
            (transfer, "Vehicle transfer rejected", "rejected")
        };

        let message = format!(
            "The transfer of vehicle {} {} ({}) from user {} to user {} was {}.",
            vehicle.make,
            vehicle.model,
            vehicle.registration_number,
            transfer.from_user_id,
            transfer.to_user_id,
            verb
        );
        let credential = caller.credential();
        futures::join!(
            self.notifier
                .notify(&transfer.from_user_id, subject, &message, credential),
            self.notifier
                .notify(&transfer.to_user_id, subject, &message, credential),
        );
        Ok(transfer)
    }

    pub async fn my_transfers(&self, caller: &AuthenticatedUser) -> AppResult<Vec<VehicleTransfer>> {
        Ok(self.store.list_transfers_for_user(&caller.user_id).await?)
    }

    pub async fn pending_received_transfers(&self, caller: &AuthenticatedUser) -> AppResult<Vec<VehicleTransfer>> {
        Ok(self
            .store
            .list_pending_transfers_for_recipient(&caller.user_id)
            .await?)
    }

    pub async fn get_transfer(&self, transfer_id: i64, caller: &AuthenticatedUser) -> AppResult<VehicleTransfer> {
        let transfer = self
            .store
            .find_transfer(transfer_id)
            .await?
            .ok_or_else(|| not_found_error("Transfer", transfer_id))?;
        if !transfer.involves(&caller.user_id) && !caller.is_admin() {
            return Err(forbidden_error("view transfer", "not a party to this transfer"));
        }
        Ok(transfer)
    }
}
