use validator::Validate;

use super::{field_error, parse_date_field};
use crate::dto::vehicle_dto::{ChangeLicensePlateRequest, CreateVehicleRequest, ExpiringVehiclesQuery};
use crate::dto::ApiResponse;
use crate::models::auth::AuthenticatedUser;
use crate::models::{OwnershipRecord, Vehicle};
use crate::services::lifecycle_service::{CreateVehicle, LifecycleService};
use crate::services::validation_engine::PlateChangeInput;
use crate::utils::errors::AppError;
use crate::utils::validation::validate_model_year;

pub struct VehicleController {
    lifecycle: LifecycleService,
}

impl VehicleController {
    pub fn new(lifecycle: LifecycleService) -> Self {
        Self { lifecycle }
    }

    pub async fn create(
        &self,
        caller: &AuthenticatedUser,
        request: CreateVehicleRequest,
    ) -> Result<ApiResponse<Vehicle>, AppError> {
        request.validate()?;
        validate_model_year(request.year).map_err(|e| field_error("year", e))?;

        let vehicle = self
            .lifecycle
            .create_vehicle(
                CreateVehicle {
                    registration_number: request.registration_number,
                    make: request.make,
                    model: request.model,
                    year: request.year,
                },
                caller,
            )
            .await?;
        Ok(ApiResponse::success_with_message(vehicle, "Vehicle created"))
    }

    pub async fn deregister(&self, caller: &AuthenticatedUser, id: i64) -> Result<ApiResponse<Vehicle>, AppError> {
        let vehicle = self.lifecycle.deregister(id, caller).await?;
        Ok(ApiResponse::success_with_message(vehicle, "Vehicle deregistered"))
    }

    pub async fn change_license_plate(
        &self,
        caller: &AuthenticatedUser,
        id: i64,
        request: ChangeLicensePlateRequest,
    ) -> Result<ApiResponse<Vehicle>, AppError> {
        let certificate_date = request
            .technical_validity_certificate_date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(|d| parse_date_field("technicalValidityCertificateDate", d))
            .transpose()?;

        let input = PlateChangeInput {
            new_registration_number: request.new_registration_number,
            reason: request.reason,
            has_technical_validity_certificate: request.has_technical_validity_certificate,
            technical_validity_certificate_date: certificate_date,
            has_insurance_proof: request.has_insurance_proof,
            has_owner_identity_proof: request.has_owner_identity_proof,
            has_payment_confirmation: request.has_payment_confirmation,
            has_previous_license_plate: request.has_previous_license_plate,
        };
        let vehicle = self.lifecycle.change_license_plate(id, input, caller).await?;
        Ok(ApiResponse::success_with_message(vehicle, "License plate changed"))
    }

    pub async fn ownership_history(
        &self,
        caller: &AuthenticatedUser,
        id: i64,
    ) -> Result<ApiResponse<Vec<OwnershipRecord>>, AppError> {
        let history = self.lifecycle.ownership_history(id, caller).await?;
        Ok(ApiResponse::success(history))
    }

    pub async fn expiring(
        &self,
        caller: &AuthenticatedUser,
        query: ExpiringVehiclesQuery,
        default_days: i64,
    ) -> Result<ApiResponse<Vec<Vehicle>>, AppError> {
        query.validate()?;
        let days = query.days.unwrap_or(default_days);
        let vehicles = self.lifecycle.expiring_vehicles(days, caller).await?;
        Ok(ApiResponse::success(vehicles))
    }
}
