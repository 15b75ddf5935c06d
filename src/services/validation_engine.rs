//! Motor de validación
//!
//! Reglas puras, sin I/O, evaluadas contra una foto del vehículo. Cada tipo de
//! transición tiene su propia tabla de reglas; los hechos externos
//! (solicitudes pendientes, unicidad de matrícula, existencia del usuario
//! destino) los aporta quien llama.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{RequestType, Vehicle, VehicleStatus};
use crate::utils::validation::validate_registration_number;

/// Antigüedad máxima del certificado / inspección técnica
pub const INSPECTION_MAX_AGE_DAYS: i64 = 30;

/// Períodos de renovación admitidos (meses)
pub const RENEWAL_PERIODS_MONTHS: [u32; 4] = [3, 6, 12, 24];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationCategory {
    /// Estado de partida incorrecto, estado terminal o solicitud pendiente duplicada
    State,
    Document,
    Business,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub category: ViolationCategory,
    pub code: String,
    pub message: String,
}

impl Violation {
    pub fn state(code: &str, message: impl Into<String>) -> Self {
        Self { category: ViolationCategory::State, code: code.to_string(), message: message.into() }
    }

    pub fn document(code: &str, message: impl Into<String>) -> Self {
        Self { category: ViolationCategory::Document, code: code.to_string(), message: message.into() }
    }

    pub fn business(code: &str, message: impl Into<String>) -> Self {
        Self { category: ViolationCategory::Business, code: code.to_string(), message: message.into() }
    }

    pub fn pending_registration_exists() -> Self {
        Self::state(
            "pending_request_exists",
            "A pending registration request already exists for this vehicle",
        )
    }

    pub fn pending_transfer_exists() -> Self {
        Self::state(
            "pending_transfer_exists",
            "A pending transfer request already exists for this vehicle",
        )
    }

    pub fn not_pending(what: &str) -> Self {
        Self::state("not_pending", format!("Only pending {} can be processed", what))
    }

    pub fn registration_number_taken(number: &str) -> Self {
        Self::business(
            "registration_number_taken",
            format!("Registration number {} already exists", number),
        )
    }

    pub fn is_pending_conflict(&self) -> bool {
        self.code == "pending_request_exists" || self.code == "pending_transfer_exists"
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Presencia de un documento adjunto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Presence {
    #[default]
    Missing,
    Present,
    /// Adjuntado pero ilegible (p.ej. base64 inválido)
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Insurance,
    Inspection,
    Identity,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Insurance => "insurance",
            DocumentKind::Inspection => "inspection",
            DocumentKind::Identity => "identity",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            DocumentKind::Insurance => "Insurance",
            DocumentKind::Inspection => "Inspection",
            DocumentKind::Identity => "Identity",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentSet {
    pub insurance: Presence,
    pub inspection: Presence,
    pub identity: Presence,
}

impl DocumentSet {
    pub fn get(&self, kind: DocumentKind) -> Presence {
        match kind {
            DocumentKind::Insurance => self.insurance,
            DocumentKind::Inspection => self.inspection,
            DocumentKind::Identity => self.identity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistrationInput {
    pub request_type: RequestType,
    pub inspection_date: NaiveDate,
    pub period_months: Option<u32>,
    pub documents: DocumentSet,
}

#[derive(Debug, Clone)]
pub struct TransferInput {
    pub caller_id: String,
    pub target_user_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct PlateChangeInput {
    pub new_registration_number: String,
    pub reason: String,
    pub has_technical_validity_certificate: bool,
    pub technical_validity_certificate_date: Option<NaiveDate>,
    pub has_insurance_proof: bool,
    pub has_owner_identity_proof: bool,
    pub has_payment_confirmation: bool,
    pub has_previous_license_plate: bool,
}

/// Solicitud tipada; cada variante tiene su tabla de reglas
#[derive(Debug, Clone)]
pub enum TransitionInput {
    Registration(RegistrationInput),
    Transfer(TransferInput),
    PlateChange(PlateChangeInput),
}

/// Lo que el servicio de identidad dijo del usuario destino
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetUser {
    /// No se pudo consultar; se permite continuar
    #[default]
    Unknown,
    Active,
    Inactive,
    Missing,
}

/// Hechos externos aportados por quien llama
#[derive(Debug, Clone, Copy, Default)]
pub struct Facts {
    pub has_pending_registration: bool,
    pub has_pending_transfer: bool,
    pub registration_number_taken: bool,
    pub target_user: TargetUser,
}

pub struct RuleContext<'a> {
    pub vehicle: &'a Vehicle,
    pub input: &'a TransitionInput,
    pub facts: Facts,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Proof {
    Insurance,
    Identity,
    Payment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    VehicleNotTerminal,
    StatusIs(VehicleStatus),
    RenewalWindowOpen,
    NoPendingRegistration,
    NoPendingTransfer,
    InspectionRecent,
    Document(DocumentKind),
    RenewalPeriod,
    TargetPresent,
    TargetNotSelf,
    TargetKnown,
    ReasonPresent,
    NewNumberValid,
    NewNumberAvailable,
    CertificateRecent,
    ProofPresent(Proof),
    PreviousPlateSurrendered,
}

const NEW_REGISTRATION_RULES: &[Rule] = &[
    Rule::VehicleNotTerminal,
    Rule::StatusIs(VehicleStatus::Unregistered),
    Rule::NoPendingRegistration,
    Rule::InspectionRecent,
    Rule::Document(DocumentKind::Insurance),
    Rule::Document(DocumentKind::Inspection),
    Rule::Document(DocumentKind::Identity),
];

const RENEWAL_RULES: &[Rule] = &[
    Rule::VehicleNotTerminal,
    Rule::StatusIs(VehicleStatus::Registered),
    Rule::RenewalWindowOpen,
    Rule::NoPendingRegistration,
    Rule::InspectionRecent,
    Rule::Document(DocumentKind::Insurance),
    Rule::Document(DocumentKind::Inspection),
    Rule::RenewalPeriod,
];

const TRANSFER_RULES: &[Rule] = &[
    Rule::VehicleNotTerminal,
    Rule::NoPendingTransfer,
    Rule::TargetPresent,
    Rule::TargetNotSelf,
    Rule::TargetKnown,
];

const PLATE_CHANGE_RULES: &[Rule] = &[
    Rule::VehicleNotTerminal,
    Rule::StatusIs(VehicleStatus::Registered),
    Rule::ReasonPresent,
    Rule::NewNumberValid,
    Rule::NewNumberAvailable,
    Rule::CertificateRecent,
    Rule::ProofPresent(Proof::Insurance),
    Rule::ProofPresent(Proof::Identity),
    Rule::ProofPresent(Proof::Payment),
    Rule::PreviousPlateSurrendered,
];

fn rules_for(input: &TransitionInput) -> &'static [Rule] {
    match input {
        TransitionInput::Registration(r) => match r.request_type {
            RequestType::New => NEW_REGISTRATION_RULES,
            RequestType::Renewal => RENEWAL_RULES,
        },
        TransitionInput::Transfer(_) => TRANSFER_RULES,
        TransitionInput::PlateChange(_) => PLATE_CHANGE_RULES,
    }
}

/// Evalúa todas las reglas de la transición y devuelve todas las violaciones
/// en el orden de la tabla. Vacío = válido.
pub fn evaluate(ctx: &RuleContext<'_>) -> Vec<Violation> {
    rules_for(ctx.input)
        .iter()
        .filter_map(|rule| check(*rule, ctx))
        .collect()
}

/// Edad en días de una fecha respecto a hoy: error si está en el futuro o
/// supera el máximo.
fn date_recency(date: NaiveDate, today: NaiveDate) -> Result<(), Recency> {
    let age = (today - date).num_days();
    if age < 0 {
        Err(Recency::Future)
    } else if age > INSPECTION_MAX_AGE_DAYS {
        Err(Recency::TooOld)
    } else {
        Ok(())
    }
}

enum Recency {
    Future,
    TooOld,
}

fn check(rule: Rule, ctx: &RuleContext<'_>) -> Option<Violation> {
    let vehicle = ctx.vehicle;
    let today = ctx.now.date_naive();

    match rule {
        Rule::VehicleNotTerminal => vehicle.status.is_terminal().then(|| {
            Violation::state(
                "vehicle_deregistered",
                format!("Vehicle {} is deregistered", vehicle.registration_number),
            )
        }),

        Rule::StatusIs(expected) => {
            // el estado terminal ya se reporta una vez
            if vehicle.status == expected || vehicle.status.is_terminal() {
                return None;
            }
            let message = match (expected, vehicle.status) {
                (VehicleStatus::Unregistered, VehicleStatus::Registered) => {
                    "Vehicle is already registered. Use renewal for registered vehicles.".to_string()
                }
                (VehicleStatus::Registered, _) => match ctx.input {
                    TransitionInput::Registration(_) => {
                        "Only registered vehicles can be renewed".to_string()
                    }
                    _ => "Vehicle must be registered".to_string(),
                },
                _ => format!("Vehicle must be {} but is {}", expected, vehicle.status),
            };
            Some(Violation::state("wrong_status", message))
        }

        Rule::RenewalWindowOpen => {
            if vehicle.status != VehicleStatus::Registered || vehicle.renewal_window_open(ctx.now) {
                return None;
            }
            Some(Violation::state(
                "renewal_window_closed",
                "Vehicle can only be renewed if it expires within 30 days or is already expired",
            ))
        }

        Rule::NoPendingRegistration => ctx
            .facts
            .has_pending_registration
            .then(Violation::pending_registration_exists),

        Rule::NoPendingTransfer => ctx
            .facts
            .has_pending_transfer
            .then(Violation::pending_transfer_exists),

        Rule::InspectionRecent => {
            let TransitionInput::Registration(input) = ctx.input else { return None };
            match date_recency(input.inspection_date, today) {
                Ok(()) => None,
                Err(Recency::TooOld) => Some(Violation::business(
                    "inspection_too_old",
                    "Technical inspection date must be within the last 30 days",
                )),
                Err(Recency::Future) => Some(Violation::business(
                    "inspection_in_future",
                    "Technical inspection date cannot be in the future",
                )),
            }
        }

        Rule::Document(kind) => {
            let TransitionInput::Registration(input) = ctx.input else { return None };
            match input.documents.get(kind) {
                Presence::Present => None,
                Presence::Missing => Some(Violation::document(
                    &format!("{}_document_missing", kind.as_str()),
                    format!("{} document is required", kind.label()),
                )),
                Presence::Invalid => Some(Violation::document(
                    &format!("{}_document_invalid", kind.as_str()),
                    format!("{} document could not be decoded", kind.label()),
                )),
            }
        }

        Rule::RenewalPeriod => {
            let TransitionInput::Registration(input) = ctx.input else { return None };
            match input.period_months {
                Some(months) if !RENEWAL_PERIODS_MONTHS.contains(&months) => Some(Violation::business(
                    "renewal_period_invalid",
                    "Renewal period must be 3, 6, 12, or 24 months",
                )),
                _ => None,
            }
        }

        Rule::TargetPresent => {
            let TransitionInput::Transfer(input) = ctx.input else { return None };
            input.target_user_id.trim().is_empty().then(|| {
                Violation::business("target_user_missing", "Target user ID is required")
            })
        }

        Rule::TargetNotSelf => {
            let TransitionInput::Transfer(input) = ctx.input else { return None };
            (input.target_user_id.trim() == input.caller_id).then(|| {
                Violation::business("transfer_to_self", "Cannot transfer vehicle to yourself")
            })
        }

        Rule::TargetKnown => {
            let TransitionInput::Transfer(input) = ctx.input else { return None };
            match ctx.facts.target_user {
                TargetUser::Missing => Some(Violation::business(
                    "target_user_unknown",
                    format!("User {} does not exist", input.target_user_id.trim()),
                )),
                TargetUser::Inactive => Some(Violation::business(
                    "target_user_inactive",
                    format!("User {} is not active", input.target_user_id.trim()),
                )),
                TargetUser::Active | TargetUser::Unknown => None,
            }
        }

        Rule::ReasonPresent => {
            let TransitionInput::PlateChange(input) = ctx.input else { return None };
            input.reason.trim().is_empty().then(|| {
                Violation::business(
                    "reason_missing",
                    "Reason for license plate change is required",
                )
            })
        }

        Rule::NewNumberValid => {
            let TransitionInput::PlateChange(input) = ctx.input else { return None };
            let number = input.new_registration_number.trim();
            if number.is_empty() {
                return Some(Violation::business(
                    "registration_number_missing",
                    "New registration number is required",
                ));
            }
            if number.eq_ignore_ascii_case(&vehicle.registration_number) {
                return Some(Violation::business(
                    "registration_number_unchanged",
                    "New registration number must differ from the current one",
                ));
            }
            validate_registration_number(number).err().map(|_| {
                Violation::business(
                    "registration_number_format",
                    format!("Registration number {} has an invalid format", number),
                )
            })
        }

        Rule::NewNumberAvailable => {
            let TransitionInput::PlateChange(input) = ctx.input else { return None };
            ctx.facts
                .registration_number_taken
                .then(|| Violation::registration_number_taken(input.new_registration_number.trim()))
        }

        Rule::CertificateRecent => {
            let TransitionInput::PlateChange(input) = ctx.input else { return None };
            if !input.has_technical_validity_certificate {
                return Some(Violation::document(
                    "certificate_missing",
                    "Registration list with technical validity certificate is required",
                ));
            }
            let Some(date) = input.technical_validity_certificate_date else {
                return Some(Violation::document(
                    "certificate_date_missing",
                    "Technical validity certificate date is required",
                ));
            };
            match date_recency(date, today) {
                Ok(()) => None,
                Err(Recency::TooOld) => Some(Violation::business(
                    "certificate_too_old",
                    "Technical validity certificate is older than 30 days",
                )),
                Err(Recency::Future) => Some(Violation::business(
                    "certificate_in_future",
                    "Technical validity certificate date cannot be in the future",
                )),
            }
        }

        Rule::ProofPresent(proof) => {
            let TransitionInput::PlateChange(input) = ctx.input else { return None };
            let (present, code, message) = match proof {
                Proof::Insurance => (
                    input.has_insurance_proof,
                    "insurance_proof_missing",
                    "Proof of mandatory vehicle insurance is required",
                ),
                Proof::Identity => (
                    input.has_owner_identity_proof,
                    "identity_proof_missing",
                    "Proof of owner identity is required",
                ),
                Proof::Payment => (
                    input.has_payment_confirmation,
                    "payment_confirmation_missing",
                    "Payment confirmation from eGovernment portal is required",
                ),
            };
            (!present).then(|| Violation::document(code, message))
        }

        Rule::PreviousPlateSurrendered => {
            let TransitionInput::PlateChange(input) = ctx.input else { return None };
            let reason = input.reason.to_lowercase();
            let exempt = reason.contains("lost") || reason.contains("stolen");
            (!exempt && !input.has_previous_license_plate).then(|| {
                Violation::document(
                    "previous_plate_not_returned",
                    "Previous license plates must be returned (unless lost or stolen)",
                )
            })
        }
    }
}
