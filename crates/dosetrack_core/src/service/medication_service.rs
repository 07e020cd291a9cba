//! Medication use-case service.
//!
//! # Responsibility
//! - Provide CRUD and mark-taken entry points for application callers.
//! - Project medications into rendering-ready dose status and the
//!   pending/taken routine partition.
//!
//! # Invariants
//! - The Pending -> Taken transition is external: `mark_taken` records the
//!   instant and nothing else; taken state itself stays derived.
//! - Service APIs remain storage-agnostic over `MedicationRepository`.

use crate::model::medication::{
    DoseTime, Medication, MedicationCategory, MedicationId,
};
use crate::repo::medication_repo::{MedicationListQuery, MedicationRepository, RepoError};
use crate::schedule::dose_window::{
    format_remaining, is_dose_taken, next_dose_at, previous_dose_at, remaining_percentage,
    TakenResetRule,
};
use chrono::NaiveDateTime;
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service error for medication use-cases.
#[derive(Debug)]
pub enum MedicationServiceError {
    /// Target medication does not exist (or is tombstoned).
    MedicationNotFound(MedicationId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for MedicationServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MedicationNotFound(id) => write!(f, "medication not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MedicationServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::MedicationNotFound(_) => None,
        }
    }
}

impl From<RepoError> for MedicationServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::MedicationNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Request model for registering a medication.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMedicationRequest {
    pub user_id: Uuid,
    pub name: String,
    pub dosage_time: DoseTime,
    pub periodicity_hours: f64,
    pub category: MedicationCategory,
    pub notes: String,
}

/// Rendering-ready dose state for one medication at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoseStatus {
    pub medication_id: MedicationId,
    /// Start of the current window; the instant this dose became due.
    pub due_at: NaiveDateTime,
    /// Earliest boundary strictly after the evaluated instant.
    pub next_dose_at: NaiveDateTime,
    /// Fraction of the current window still remaining, `[0, 100]`.
    pub remaining_percentage: f64,
    /// Countdown label for the card, e.g. `2h 30m` or `due now`.
    pub remaining_label: String,
    /// Derived taken state for the current window.
    pub taken: bool,
}

/// Dashboard partition of visible medications by derived taken state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutineView {
    /// Still to take in the current window, paired with dose status.
    pub pending: Vec<(Medication, DoseStatus)>,
    /// Already confirmed for the current window.
    pub taken: Vec<(Medication, DoseStatus)>,
}

/// Projects one medication into its rendering-ready dose state.
///
/// Pure: derived entirely from the record and the supplied instant. Callers
/// re-invoke on their own polling cadence to reflect window transitions.
pub fn dose_status(medication: &Medication, now: NaiveDateTime, rule: TakenResetRule) -> DoseStatus {
    let next = next_dose_at(medication, now);
    DoseStatus {
        medication_id: medication.uuid,
        due_at: previous_dose_at(medication, now),
        next_dose_at: next,
        remaining_percentage: remaining_percentage(medication, now),
        remaining_label: format_remaining(next - now),
        taken: is_dose_taken(medication, now, rule),
    }
}

/// Use-case service facade over medication stores.
pub struct MedicationService<R: MedicationRepository> {
    repo: R,
}

impl<R: MedicationRepository> MedicationService<R> {
    /// Creates a service using the provided store implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new medication for a user.
    ///
    /// # Contract
    /// - `created_at` is set to `now`; taken/notified history starts empty.
    /// - Schedule configuration is validated before persistence.
    pub fn create_medication(
        &self,
        request: &CreateMedicationRequest,
        now: NaiveDateTime,
    ) -> Result<Medication, MedicationServiceError> {
        let mut medication = Medication::new(
            request.user_id,
            request.name.trim(),
            request.dosage_time,
            request.periodicity_hours,
            now,
        );
        medication.category = request.category;
        medication.notes = request.notes.clone();

        self.repo.create_medication(&medication)?;
        info!(
            "event=medication_create module=service status=ok medication_id={} periodicity_hours={}",
            medication.uuid, medication.periodicity_hours
        );
        Ok(medication)
    }

    /// Updates an existing medication by stable ID.
    pub fn update_medication(&self, medication: &Medication) -> Result<(), MedicationServiceError> {
        self.repo.update_medication(medication)?;
        Ok(())
    }

    /// Gets one medication by ID with optional tombstone visibility.
    pub fn get_medication(
        &self,
        id: MedicationId,
        include_deleted: bool,
    ) -> Result<Option<Medication>, MedicationServiceError> {
        Ok(self.repo.get_medication(id, include_deleted)?)
    }

    /// Lists medications using filter and pagination options.
    pub fn list_medications(
        &self,
        query: &MedicationListQuery,
    ) -> Result<Vec<Medication>, MedicationServiceError> {
        Ok(self.repo.list_medications(query)?)
    }

    /// Records a user-confirmed dose at `now`.
    ///
    /// The Taken -> Pending reversal needs no counterpart here: it happens on
    /// its own when the wall clock crosses the window boundary.
    pub fn mark_taken(
        &self,
        id: MedicationId,
        now: NaiveDateTime,
    ) -> Result<(), MedicationServiceError> {
        self.repo.mark_taken(id, now)?;
        info!("event=medication_taken module=service status=ok medication_id={id}");
        Ok(())
    }

    /// Soft-deletes a medication by ID.
    pub fn soft_delete_medication(&self, id: MedicationId) -> Result<(), MedicationServiceError> {
        self.repo.soft_delete_medication(id)?;
        Ok(())
    }

    /// Builds the dashboard view: visible medications partitioned into
    /// pending and taken sections, each with its dose status at `now`.
    pub fn routine(
        &self,
        query: &MedicationListQuery,
        now: NaiveDateTime,
        rule: TakenResetRule,
    ) -> Result<RoutineView, MedicationServiceError> {
        let mut view = RoutineView::default();
        for medication in self.repo.list_medications(query)? {
            let status = dose_status(&medication, now, rule);
            if status.taken {
                view.taken.push((medication, status));
            } else {
                view.pending.push((medication, status));
            }
        }
        Ok(view)
    }
}
