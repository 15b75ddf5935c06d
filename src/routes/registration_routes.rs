use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::registration_controller::RegistrationController;
use crate::dto::registration_dto::{
    RegistrationListQuery, ReviewRegistrationRequest, SubmitRegistrationRequest,
};
use crate::dto::ApiResponse;
use crate::models::auth::AuthenticatedUser;
use crate::models::RegistrationRequest;
use crate::services::document_storage::MAX_DOCUMENT_BYTES;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Tres adjuntos en base64 (4/3 del tamaño) más margen para el resto del JSON
pub const SUBMISSION_BODY_LIMIT: usize = MAX_DOCUMENT_BYTES / 3 * 4 * 3 + 1024 * 1024;

pub fn create_registration_router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_request).get(list_requests))
        .route("/my-requests", get(my_requests))
        .route("/:id", get(get_request))
        .route("/:id/review", post(review_request))
        .layer(DefaultBodyLimit::max(SUBMISSION_BODY_LIMIT))
}

async fn submit_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<SubmitRegistrationRequest>,
) -> Result<Json<ApiResponse<RegistrationRequest>>, AppError> {
    let controller = RegistrationController::new(state.lifecycle.clone());
    Ok(Json(controller.submit(&user, request).await?))
}

async fn list_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<RegistrationListQuery>,
) -> Result<Json<ApiResponse<Vec<RegistrationRequest>>>, AppError> {
    let controller = RegistrationController::new(state.lifecycle.clone());
    Ok(Json(controller.list(&user, query).await?))
}

async fn my_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<RegistrationRequest>>>, AppError> {
    let controller = RegistrationController::new(state.lifecycle.clone());
    Ok(Json(controller.mine(&user).await?))
}

async fn get_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RegistrationRequest>>, AppError> {
    let controller = RegistrationController::new(state.lifecycle.clone());
    Ok(Json(controller.get(&user, id).await?))
}

async fn review_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<ReviewRegistrationRequest>,
) -> Result<Json<ApiResponse<RegistrationRequest>>, AppError> {
    let controller = RegistrationController::new(state.lifecycle.clone());
    Ok(Json(controller.review(&user, id, request).await?))
}
