use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::transfer_controller::TransferController;
use crate::dto::transfer_dto::{CreateTransferRequest, RespondTransferRequest};
use crate::dto::ApiResponse;
use crate::models::auth::AuthenticatedUser;
use crate::models::VehicleTransfer;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_transfer_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_transfer))
        .route("/my-requests", get(my_transfers))
        .route("/pending-received", get(pending_received))
        .route("/:id", get(get_transfer))
        .route("/:id/respond", post(respond_transfer))
}

async fn create_transfer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateTransferRequest>,
) -> Result<Json<ApiResponse<VehicleTransfer>>, AppError> {
    let controller = TransferController::new(state.lifecycle.clone());
    Ok(Json(controller.create(&user, request).await?))
}

async fn my_transfers(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<VehicleTransfer>>>, AppError> {
    let controller = TransferController::new(state.lifecycle.clone());
    Ok(Json(controller.mine(&user).await?))
}

async fn pending_received(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<VehicleTransfer>>>, AppError> {
    let controller = TransferController::new(state.lifecycle.clone());
    Ok(Json(controller.pending_received(&user).await?))
}

async fn get_transfer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<VehicleTransfer>>, AppError> {
    let controller = TransferController::new(state.lifecycle.clone());
    Ok(Json(controller.get(&user, id).await?))
}

async fn respond_transfer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<RespondTransferRequest>,
) -> Result<Json<ApiResponse<VehicleTransfer>>, AppError> {
    let controller = TransferController::new(state.lifecycle.clone());
    Ok(Json(controller.respond(&user, id, request).await?))
}
