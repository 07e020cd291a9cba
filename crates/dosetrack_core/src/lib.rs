//! Core domain logic for dosetrack, a personal medication reminder.
//! This crate is the single source of truth for dose-window invariants.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;

pub use auth::demo::DemoAuthProvider;
pub use auth::{AuthError, AuthProvider, UserProfile};
pub use config::{AppConfig, StorageMode};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::medication::{
    DoseTime, Medication, MedicationCategory, MedicationId, MedicationValidationError,
};
pub use repo::medication_repo::{
    MedicationListQuery, MedicationRepository, RepoError, RepoResult, SqliteMedicationRepository,
};
pub use repo::memory_repo::MemoryMedicationRepository;
pub use schedule::dose_window::{
    current_window, format_remaining, is_dose_taken, next_dose_at, previous_dose_at,
    remaining_percentage, DoseWindow, TakenResetRule, DUE_NOW_LABEL,
};
pub use service::medication_service::{
    dose_status, CreateMedicationRequest, DoseStatus, MedicationService, MedicationServiceError,
    RoutineView,
};
pub use service::reminder_service::{DoseAlert, ReminderService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
