use validator::Validate;

use super::parse_date_field;
use crate::dto::registration_dto::{
    DocumentPayload, RegistrationListQuery, ReviewRegistrationRequest, SubmitRegistrationRequest,
};
use crate::dto::ApiResponse;
use crate::models::auth::AuthenticatedUser;
use crate::models::{RegistrationRequest, RequestStatus};
use crate::services::lifecycle_service::{DocumentUpload, LifecycleService, SubmitRegistration};
use crate::utils::errors::AppError;

pub struct RegistrationController {
    lifecycle: LifecycleService,
}

fn upload(payload: Option<DocumentPayload>) -> Option<DocumentUpload> {
    payload.map(|p| DocumentUpload {
        file_name: p.file_name,
        content_base64: p.content_base64,
    })
}

impl RegistrationController {
    pub fn new(lifecycle: LifecycleService) -> Self {
        Self { lifecycle }
    }

    pub async fn submit(
        &self,
        caller: &AuthenticatedUser,
        request: SubmitRegistrationRequest,
    ) -> Result<ApiResponse<RegistrationRequest>, AppError> {
        request.validate()?;
        let inspection_date =
            parse_date_field("technicalInspectionDate", &request.technical_inspection_date)?;

        let command = SubmitRegistration {
            vehicle_id: request.vehicle_id,
            request_type: request.request_type,
            technical_inspection_date: inspection_date,
            period_months: request.period_months,
            insurance: upload(request.insurance_document),
            inspection: upload(request.technical_inspection_document),
            identity: upload(request.identity_document),
        };
        let created = self.lifecycle.submit_registration(command, caller).await?;
        Ok(ApiResponse::success_with_message(created, "Registration request submitted"))
    }

    pub async fn review(
        &self,
        caller: &AuthenticatedUser,
        id: i64,
        request: ReviewRegistrationRequest,
    ) -> Result<ApiResponse<RegistrationRequest>, AppError> {
        let reviewed = self
            .lifecycle
            .review_registration(id, request.approve, request.rejection_reason.as_deref(), caller)
            .await?;
        let message = if request.approve {
            "Registration request approved"
        } else {
            "Registration request rejected"
        };
        Ok(ApiResponse::success_with_message(reviewed, message))
    }

    pub async fn list(
        &self,
        caller: &AuthenticatedUser,
        query: RegistrationListQuery,
    ) -> Result<ApiResponse<Vec<RegistrationRequest>>, AppError> {
        let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => Some(
                RequestStatus::from_str(raw)
                    .ok_or_else(|| AppError::BadRequest(format!("Unknown request status '{}'", raw)))?,
            ),
        };
        let requests = self.lifecycle.list_registration_requests(status, caller).await?;
        Ok(ApiResponse::success(requests))
    }

    pub async fn mine(&self, caller: &AuthenticatedUser) -> Result<ApiResponse<Vec<RegistrationRequest>>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.my_registration_requests(caller).await?))
    }

    pub async fn get(&self, caller: &AuthenticatedUser, id: i64) -> Result<ApiResponse<RegistrationRequest>, AppError> {
        Ok(ApiResponse::success(self.lifecycle.get_registration_request(id, caller).await?))
    }
}
