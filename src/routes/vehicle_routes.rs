use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::vehicle_controller::VehicleController;
use crate::dto::vehicle_dto::{ChangeLicensePlateRequest, CreateVehicleRequest, ExpiringVehiclesQuery};
use crate::dto::ApiResponse;
use crate::models::auth::AuthenticatedUser;
use crate::models::{OwnershipRecord, Vehicle};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_vehicle))
        .route("/expiring", get(expiring_vehicles))
        .route("/:id/deregister", post(deregister_vehicle))
        .route("/:id/change-license-plate", post(change_license_plate))
        .route("/:id/ownership-history", get(ownership_history))
}

async fn create_vehicle(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(state.lifecycle.clone());
    Ok(Json(controller.create(&user, request).await?))
}

async fn expiring_vehicles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ExpiringVehiclesQuery>,
) -> Result<Json<ApiResponse<Vec<Vehicle>>>, AppError> {
    let controller = VehicleController::new(state.lifecycle.clone());
    let default_days = state.config.expiration_warning_days;
    Ok(Json(controller.expiring(&user, query, default_days).await?))
}

async fn deregister_vehicle(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(state.lifecycle.clone());
    Ok(Json(controller.deregister(&user, id).await?))
}

async fn change_license_plate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<ChangeLicensePlateRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(state.lifecycle.clone());
    Ok(Json(controller.change_license_plate(&user, id, request).await?))
}

async fn ownership_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<OwnershipRecord>>>, AppError> {
    let controller = VehicleController::new(state.lifecycle.clone());
    Ok(Json(controller.ownership_history(&user, id).await?))
}
