//! Métricas Prometheus del servicio

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    static ref GATEWAY_FAILURES: IntCounterVec = register(
        "vehicle_registry_gateway_failures_total",
        "Failed calls to collaborating services",
        &["gateway"],
    );

    static ref NOTIFICATIONS: IntCounterVec = register(
        "vehicle_registry_notifications_total",
        "Notification attempts by outcome",
        &["outcome"],
    );

    static ref FINES_GATE: IntCounterVec = register(
        "vehicle_registry_fines_gate_total",
        "Outstanding-fines checks by outcome",
        &["outcome"],
    );

    static ref EXPIRATION_SCAN: IntCounterVec = register(
        "vehicle_registry_expiration_scan_total",
        "Expiration warnings by outcome",
        &["outcome"],
    );
}

fn register(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    let counter = IntCounterVec::new(Opts::new(name, help), labels)
        .expect("metric definition");
    if let Err(e) = REGISTRY.register(Box::new(counter.clone())) {
        log::warn!("⚠️ Metric {} not registered: {}", name, e);
    }
    counter
}

pub fn gateway_failure(gateway: &str) {
    GATEWAY_FAILURES.with_label_values(&[gateway]).inc();
}

pub fn notification(outcome: &str) {
    NOTIFICATIONS.with_label_values(&[outcome]).inc();
}

pub fn fines_gate(outcome: &str) {
    FINES_GATE.with_label_values(&[outcome]).inc();
}

pub fn expiration_scan(outcome: &str, count: u64) {
    EXPIRATION_SCAN.with_label_values(&[outcome]).inc_by(count);
}

/// Exposición en formato texto para `GET /metrics`
pub fn render() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        log::error!("❌ Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
