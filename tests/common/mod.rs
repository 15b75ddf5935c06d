//! Fakes en proceso para los servicios externos y un arnés con el store en
//! memoria. Ningún test necesita red ni base de datos.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use vehicle_registry::clients::{
    EnforcementGateway, IdentityGateway, IdentityUser, NotificationGateway, NotificationMessage,
};
use vehicle_registry::clients::GatewayError;
use vehicle_registry::models::auth::{AuthenticatedUser, UserRole};
use vehicle_registry::models::{RequestType, Vehicle, VehicleStatus};
use vehicle_registry::repositories::{MemoryVehicleStore, VehicleStore};
use vehicle_registry::services::document_storage::DocumentStorage;
use vehicle_registry::services::lifecycle_service::{DocumentUpload, SubmitRegistration};
use vehicle_registry::services::{FinesGate, LifecycleService, Notifier};

#[derive(Default)]
pub struct FakeEnforcement {
    fines: Mutex<HashMap<String, Decimal>>,
    failing: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeEnforcement {
    pub fn set_fines(&self, registration_number: &str, amount: Decimal) {
        self.fines
            .lock()
            .unwrap()
            .insert(registration_number.to_string(), amount);
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl EnforcementGateway for FakeEnforcement {
    async fn outstanding_fines(
        &self,
        registration_number: &str,
        _credential: Option<&str>,
    ) -> Result<Decimal, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Status {
                status: 503,
                body: "enforcement offline".to_string(),
            });
        }
        Ok(self
            .fines
            .lock()
            .unwrap()
            .get(registration_number)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }
}

/// Cualquier usuario existe, está activo y tiene email `{id}@mail.test`
/// salvo que se indique lo contrario.
#[derive(Default)]
pub struct FakeIdentity {
    overrides: Mutex<HashMap<String, Option<IdentityUser>>>,
    failing: AtomicBool,
}

impl FakeIdentity {
    pub fn missing(&self, user_id: &str) {
        self.overrides.lock().unwrap().insert(user_id.to_string(), None);
    }

    pub fn inactive(&self, user_id: &str) {
        let mut user = active_user(user_id);
        user.is_active = false;
        self.overrides
            .lock()
            .unwrap()
            .insert(user_id.to_string(), Some(user));
    }

    pub fn without_email(&self, user_id: &str) {
        let mut user = active_user(user_id);
        user.email = None;
        self.overrides
            .lock()
            .unwrap()
            .insert(user_id.to_string(), Some(user));
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

fn active_user(user_id: &str) -> IdentityUser {
    IdentityUser {
        username: Some(user_id.to_string()),
        email: Some(format!("{}@mail.test", user_id)),
        role: Some("User".to_string()),
        is_active: true,
    }
}

#[async_trait]
impl IdentityGateway for FakeIdentity {
    async fn find_user(
        &self,
        user_id: &str,
        _credential: Option<&str>,
    ) -> Result<Option<IdentityUser>, GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Decode("identity offline".to_string()));
        }
        match self.overrides.lock().unwrap().get(user_id) {
            Some(user) => Ok(user.clone()),
            None => Ok(Some(active_user(user_id))),
        }
    }

    async fn service_credential(&self) -> Result<Option<String>, GatewayError> {
        Ok(Some("service-token".to_string()))
    }
}

#[derive(Default)]
pub struct FakeNotifications {
    sent: Mutex<Vec<NotificationMessage>>,
    latency: Mutex<Option<Duration>>,
}

impl FakeNotifications {
    /// Cada envío tarda `latency` antes de completarse
    pub fn slow(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn sent(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, user_id: &str) -> Vec<NotificationMessage> {
        self.sent()
            .into_iter()
            .filter(|n| n.user_id == user_id)
            .collect()
    }
}

#[async_trait]
impl NotificationGateway for FakeNotifications {
    async fn send(
        &self,
        notification: &NotificationMessage,
        _credential: Option<&str>,
    ) -> Result<(), GatewayError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryVehicleStore>,
    pub enforcement: Arc<FakeEnforcement>,
    pub identity: Arc<FakeIdentity>,
    pub notifications: Arc<FakeNotifications>,
    pub notifier: Notifier,
    pub lifecycle: LifecycleService,
    pub uploads: PathBuf,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryVehicleStore::new());
        let enforcement = Arc::new(FakeEnforcement::default());
        let identity = Arc::new(FakeIdentity::default());
        let notifications = Arc::new(FakeNotifications::default());
        let uploads = std::env::temp_dir().join(format!("vehicle-registry-tests-{}", Uuid::new_v4()));
        let timeout = Duration::from_secs(2);

        let notifier = Notifier::new(identity.clone(), notifications.clone(), timeout);
        let lifecycle = LifecycleService::new(
            store.clone(),
            identity.clone(),
            FinesGate::new(enforcement.clone(), timeout),
            notifier.clone(),
            DocumentStorage::new(&uploads),
            timeout,
        );

        Self {
            store,
            enforcement,
            identity,
            notifications,
            notifier,
            lifecycle,
            uploads,
        }
    }

    pub fn store(&self) -> Arc<dyn VehicleStore> {
        self.store.clone()
    }

    pub async fn vehicle(&self, owner: &str, status: VehicleStatus, expires_in_days: Option<i64>) -> Vehicle {
        self.store
            .import_vehicle(vehicle(owner, status, expires_in_days, Utc::now()))
            .await
    }

    pub async fn reload(&self, vehicle_id: i64) -> Vehicle {
        self.store.find_vehicle(vehicle_id).await.unwrap().unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.uploads);
    }
}

static PLATE_SEQ: AtomicUsize = AtomicUsize::new(100);

pub fn vehicle(owner: &str, status: VehicleStatus, expires_in_days: Option<i64>, now: DateTime<Utc>) -> Vehicle {
    let n = PLATE_SEQ.fetch_add(1, Ordering::SeqCst);
    Vehicle {
        id: 0,
        registration_number: format!("BG-{:03}-AA", n % 1000),
        make: "Zastava".to_string(),
        model: "Yugo".to_string(),
        year: 2005,
        owner_id: owner.to_string(),
        owner_name: format!("Owner {}", owner),
        status,
        expiration_date: expires_in_days.map(|d| now + chrono::Duration::days(d)),
        created_at: now - chrono::Duration::days(400),
    }
}

pub fn user(id: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: id.to_string(),
        name: Some(format!("User {}", id)),
        role: UserRole::User,
        token: Some(format!("token-{}", id)),
    }
}

pub fn admin(id: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        role: UserRole::Admin,
        ..user(id)
    }
}

pub fn pdf_upload(name: &str) -> DocumentUpload {
    DocumentUpload {
        file_name: Some(format!("{}.pdf", name)),
        content_base64: Some(STANDARD.encode(b"%PDF-1.4 test document")),
    }
}

/// Solicitud completa: inspección hace 5 días y los tres documentos
pub fn submission(vehicle_id: i64, request_type: RequestType) -> SubmitRegistration {
    SubmitRegistration {
        vehicle_id,
        request_type,
        technical_inspection_date: (Utc::now() - chrono::Duration::days(5)).date_naive(),
        period_months: None,
        insurance: Some(pdf_upload("insurance")),
        inspection: Some(pdf_upload("inspection")),
        identity: Some(pdf_upload("identity")),
    }
}
