//! Registro de vehículos
//!
//! Servicio HTTP que gestiona el ciclo de vida de los vehículos: solicitudes
//! de registro y renovación, revisión, transferencias de propiedad, bajas,
//! cambios de matrícula y avisos de vencimiento.

pub mod clients;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;
