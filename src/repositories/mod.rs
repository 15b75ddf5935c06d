//! Repositories - acceso a datos
//!
//! `VehicleStore` es la frontera de persistencia. Hay una implementación
//! PostgreSQL y otra en memoria para desarrollo y tests.

pub mod memory_vehicle_store;
pub mod pg_vehicle_store;
pub mod vehicle_store;

pub use memory_vehicle_store::MemoryVehicleStore;
pub use pg_vehicle_store::PgVehicleStore;
pub use vehicle_store::{StoreError, StoreResult, VehicleStore};
