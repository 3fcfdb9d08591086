//! Gramin Health Core Library
//!
//! SMS vitals intake and caregiver symptom triage for rural clinics.
//!
//! # Architecture
//!
//! ```text
//!  Patient SMS ──► VitalsIntake ──► readings table
//!                       │
//!                       └──► threshold check ──► AlertDispatcher ──► health worker
//!
//!  Caregiver report ──► TriagePipeline ──► triage_reports table
//!                           │
//!                           ├─ Classifier          (local artifact)
//!                           ├─ TreatmentReference  (local artifact)
//!                           └─ ReportFormatter     (hosted model, optional)
//! ```
//!
//! # Core Principle
//!
//! **Every request gets an answer.** Parse errors, missing models and
//! formatter outages degrade the reply; only storage faults are surfaced.
//!
//! # Modules
//!
//! - [`db`]: SQLite persistence for patients, readings and reports
//! - [`models`]: Domain types (Patient, Reading, TriagePrediction, etc.)
//! - [`vitals`]: SMS command parser and threshold alerts
//! - [`alert`]: Alert dispatchers (Twilio, logging, in-memory)
//! - [`triage`]: Classifier, treatment reference and the triage pipeline
//! - [`config`]: File and environment configuration
//! - [`logging`]: Tracing subscriber setup

pub mod alert;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod triage;
pub mod vitals;

// Re-export commonly used types
pub use alert::{AlertDispatcher, LoggingDispatcher, MemoryDispatcher, TwilioDispatcher};
pub use config::AppConfig;
pub use db::Database;
pub use models::{
    Measurement, Patient, PredictionTier, Reading, ReadingKind, TriagePrediction, TriageReport,
};
pub use triage::{ModelArtifacts, TriagePipeline};
pub use vitals::{AlertStatus, AlertThresholds, VitalsIntake, VitalsOutcome};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::Path;
use std::sync::{Arc, Mutex};

use gramin_health_llm::{OpenRouterFormatter, ReportFormatter};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum GraminError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for GraminError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => GraminError::NotFound(what),
            db::DbError::Constraint(what) => GraminError::InvalidInput(what),
            other => GraminError::DatabaseError(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for GraminError {
    fn from(e: config::ConfigError) -> Self {
        GraminError::ConfigError(e.to_string())
    }
}

impl From<gramin_health_llm::FormatterError> for GraminError {
    fn from(e: gramin_health_llm::FormatterError) -> Self {
        GraminError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for GraminError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        GraminError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open the core using a JSON config file (or defaults) plus environment overrides.
///
/// Installs the configured log filter unless the host already set up tracing.
#[uniffi::export]
pub fn open_core(config_path: Option<String>) -> Result<Arc<GraminHealthCore>, GraminError> {
    let config = AppConfig::load(config_path.as_deref().map(Path::new))?;
    logging::init_logging(Some(config.log_filter.clone()));
    let db = Database::open(&config.database_path)?;
    GraminHealthCore::from_config(db, &config).map(Arc::new)
}

/// Same as [`open_core`] but with an in-memory database (for testing).
#[uniffi::export]
pub fn open_core_in_memory(
    config_path: Option<String>,
) -> Result<Arc<GraminHealthCore>, GraminError> {
    let config = AppConfig::load(config_path.as_deref().map(Path::new))?;
    logging::init_logging(Some(config.log_filter.clone()));
    let db = Database::open_in_memory()?;
    GraminHealthCore::from_config(db, &config).map(Arc::new)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe service facade for FFI.
///
/// The database lock is never held across the formatter call or an alert send.
#[derive(uniffi::Object)]
pub struct GraminHealthCore {
    db: Arc<Mutex<Database>>,
    pipeline: Arc<TriagePipeline>,
    dispatcher: Arc<dyn AlertDispatcher>,
    thresholds: AlertThresholds,
}

impl GraminHealthCore {
    /// Assemble from already-built parts.
    pub fn from_parts(
        db: Database,
        pipeline: TriagePipeline,
        dispatcher: Arc<dyn AlertDispatcher>,
        thresholds: AlertThresholds,
    ) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            pipeline: Arc::new(pipeline),
            dispatcher,
            thresholds,
        }
    }

    fn from_config(db: Database, config: &AppConfig) -> Result<Self, GraminError> {
        let formatter: Arc<dyn ReportFormatter> =
            Arc::new(OpenRouterFormatter::new(&config.formatter)?);
        let pipeline = TriagePipeline::from_paths(&config.artifacts, formatter);
        let dispatcher = alert::dispatcher_from_config(&config.alerts);

        tracing::info!(
            database = %config.database_path.display(),
            model_available = pipeline.is_available(),
            "Gramin health core opened"
        );

        Ok(Self::from_parts(db, pipeline, dispatcher, config.thresholds))
    }
}

#[uniffi::export]
impl GraminHealthCore {
    // =========================================================================
    // Vitals
    // =========================================================================

    /// Handle an inbound SMS and return the reply to send back.
    pub fn handle_sms(&self, sender: String, body: String) -> Result<FfiSmsReply, GraminError> {
        let mut outcome = {
            let db = self.db.lock()?;
            let outcome = VitalsIntake::with_thresholds(&db, self.thresholds).record(&sender, &body);
            outcome
        };
        outcome.dispatch_alert(&sender, self.dispatcher.as_ref());
        Ok(outcome.into())
    }

    /// List a patient's readings, oldest first.
    pub fn list_readings(&self, patient_id: String) -> Result<Vec<FfiReading>, GraminError> {
        let db = self.db.lock()?;
        let readings = db.list_readings_for_patient(&patient_id)?;
        Ok(readings.into_iter().map(|r| r.into()).collect())
    }

    /// Latest `limit` readings of one kind (`BP` or `SUGAR`), oldest first.
    pub fn recent_readings(
        &self,
        patient_id: String,
        kind: String,
        limit: u32,
    ) -> Result<Vec<FfiReading>, GraminError> {
        let kind = ReadingKind::from_code(kind.trim())
            .ok_or_else(|| GraminError::InvalidInput(format!("unknown reading kind: {}", kind)))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        let db = self.db.lock()?;
        let readings = db.recent_readings(&patient_id, kind, limit)?;
        Ok(readings.into_iter().map(|r| r.into()).collect())
    }

    // =========================================================================
    // Triage
    // =========================================================================

    /// Run triage for a caregiver submission and store the report.
    pub fn submit_triage_report(
        &self,
        patient_id: String,
        chief_complaint: String,
        notes: String,
    ) -> Result<FfiTriageReport, GraminError> {
        if self.db.lock()?.get_patient(&patient_id)?.is_none() {
            return Err(GraminError::NotFound(format!("patient {}", patient_id)));
        }

        // Formatter call happens outside the lock
        let report = self.pipeline.assess(&patient_id, &chief_complaint, &notes);

        self.db.lock()?.insert_triage_report(&report)?;
        tracing::info!(
            report_id = %report.report_id,
            tier = report.tier().as_str(),
            "Triage report stored"
        );
        Ok(report.into())
    }

    /// List a patient's triage reports, newest first.
    pub fn list_triage_reports(
        &self,
        patient_id: String,
    ) -> Result<Vec<FfiTriageReport>, GraminError> {
        let db = self.db.lock()?;
        let reports = db.list_triage_reports_for_patient(&patient_id)?;
        Ok(reports.into_iter().map(|r| r.into()).collect())
    }

    /// Whether the classifier and treatment reference loaded.
    pub fn model_available(&self) -> bool {
        self.pipeline.is_available()
    }

    pub fn model_version(&self) -> Option<String> {
        self.pipeline.model_version().map(str::to_string)
    }

    // =========================================================================
    // Patients
    // =========================================================================

    /// Register a patient so their phone number is recognized.
    pub fn register_patient(
        &self,
        name: String,
        phone_number: String,
        caregiver_phone: Option<String>,
    ) -> Result<FfiPatient, GraminError> {
        if name.trim().is_empty() {
            return Err(GraminError::InvalidInput("name is required".into()));
        }
        if phone_number.trim().is_empty() {
            return Err(GraminError::InvalidInput("phone number is required".into()));
        }

        let mut patient = Patient::new(name, phone_number);
        if let Some(caregiver) = caregiver_phone.filter(|c| !c.trim().is_empty()) {
            patient = patient.with_caregiver(caregiver);
        }

        let db = self.db.lock()?;
        db.insert_patient(&patient)?;
        Ok(patient.into())
    }

    /// Get a patient by local ID.
    pub fn get_patient(&self, local_id: String) -> Result<Option<FfiPatient>, GraminError> {
        let db = self.db.lock()?;
        let patient = db.get_patient(&local_id)?;
        Ok(patient.map(|p| p.into()))
    }

    /// All registered patients, by name.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, GraminError> {
        let db = self.db.lock()?;
        let patients = db.list_patients()?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub local_id: String,
    pub phone_number: String,
    pub name: String,
    pub caregiver_phone: Option<String>,
    pub created_at: String,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            local_id: patient.local_id,
            phone_number: patient.phone_number,
            name: patient.name,
            caregiver_phone: patient.caregiver_phone,
            created_at: patient.created_at,
        }
    }
}

/// FFI-safe reading. `value2` is the diastolic value for BP readings.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReading {
    pub reading_id: String,
    pub patient_id: String,
    pub kind: String,
    pub value1: i64,
    pub value2: Option<i64>,
    pub created_at: String,
}

impl From<Reading> for FfiReading {
    fn from(reading: Reading) -> Self {
        Self {
            kind: reading.kind().as_str().to_string(),
            value1: reading.measurement.value1(),
            value2: reading.measurement.value2(),
            reading_id: reading.reading_id,
            patient_id: reading.patient_id,
            created_at: reading.created_at,
        }
    }
}

/// FFI-safe SMS handling result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSmsReply {
    pub reply: String,
    pub reading: Option<FfiReading>,
    pub alert_raised: bool,
    pub alert_sent: bool,
    pub storage_error: Option<String>,
}

impl From<VitalsOutcome> for FfiSmsReply {
    fn from(outcome: VitalsOutcome) -> Self {
        Self {
            alert_raised: outcome.alert.is_raised(),
            alert_sent: matches!(outcome.alert, AlertStatus::Sent { .. }),
            reply: outcome.reply,
            reading: outcome.reading.map(|r| r.into()),
            storage_error: outcome.storage_error,
        }
    }
}

/// FFI-safe triage report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTriageReport {
    pub report_id: String,
    pub patient_id: String,
    pub chief_complaint: String,
    pub notes: String,
    pub tier: String,
    pub predicted_label: Option<String>,
    pub prediction_text: String,
    pub model_version: Option<String>,
    pub created_at: String,
}

impl From<TriageReport> for FfiTriageReport {
    fn from(report: TriageReport) -> Self {
        Self {
            tier: report.tier().as_str().to_string(),
            predicted_label: report.prediction.predicted_label,
            report_id: report.report_id,
            patient_id: report.patient_id,
            chief_complaint: report.chief_complaint,
            notes: report.notes,
            prediction_text: report.prediction_text,
            model_version: report.model_version,
            created_at: report.created_at,
        }
    }
}
