//! Services module
//!
//! Este módulo contiene la lógica de negocio: el motor de reglas, el
//! orquestador del ciclo de vida, el control de multas, las notificaciones
//! y el escáner de vencimientos.

pub mod document_storage;
pub mod expiration_scanner;
pub mod fines_gate;
pub mod lifecycle_service;
pub mod metrics;
pub mod notifier;
pub mod validation_engine;

pub use expiration_scanner::{ExpirationScanner, ScanSummary, ScannerSettings};
pub use fines_gate::{FinesCheck, FinesGate};
pub use lifecycle_service::LifecycleService;
pub use notifier::{Notifier, NotifyOutcome};
