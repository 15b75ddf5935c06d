use validator::Validate;

use crate::dto::transfer_dto::{CreateTransferRequest, RespondTransferRequest};
use crate::dto::ApiResponse;
use crate::models::auth::AuthenticatedUser;
use crate::models::VehicleTransfer;
use crate::services::lifecycle_service::LifecycleService;
use crate::utils::errors::AppError;

pub struct TransferController {
    lifecycle: LifecycleService,
}

impl TransferController {
    pub fn new(lifecycle: LifecycleService) -> Self {
        Self { lifecycle }
    }

    pub async fn create(
        &self,
        caller: &AuthenticatedUser,
        request: CreateTransferRequest,
    ) -> Result<ApiResponse<VehicleTransfer>, AppError> {
        request.validate()?;
        let transfer = self
            .lifecycle
            .create_transfer(request.vehicle_id, &request.to_user_id, caller)
            .await?;
        Ok(ApiResponse::success_with_message(transfer, "Transfer request created"))
    }

    pub async fn respond(
        &self,
        caller: &AuthenticatedUser,
        id: i64,
        request: RespondTransferRequest,
    ) -> Result<ApiResponse<VehicleTransfer>, AppError> {
        let transfer = self.lifecycle.respond_transfer(id, request.accept, caller).await?;
        let message = if request.accept {
            "Transfer accepted"
        } else {
            "Transfer rejected"
        };
        Ok(ApiResponse::success_with_message(transfer, message))
    }

    pub async fn mine(&self, caller: &AuthenticatedUser) -> Result<ApiResponse<Vec<VehicleTransfer>>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.my_transfers(caller).await?))
    }

    pub async fn pending_received(
        &self,
        caller: &AuthenticatedUser,
    ) -> Result<ApiResponse<Vec<VehicleTransfer>>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.pending_received_transfers(caller).await?))
    }

    pub async fn get(&self, caller: &AuthenticatedUser, id: i64) -> Result<ApiResponse<VehicleTransfer>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.get_transfer(id, caller).await?))
    }
}
