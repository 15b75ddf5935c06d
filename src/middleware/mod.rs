//! Middleware del sistema
//!
//! Autenticación por JWT (extractor) y CORS.

pub mod auth;
pub mod cors;

pub use cors::cors_layer;
