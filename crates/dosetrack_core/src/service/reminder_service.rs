//! Due-dose polling service.
//!
//! # Responsibility
//! - Decide, once per evaluation tick, which medications crossed a dose
//!   boundary since they were last alerted.
//! - Record the alert instant so each boundary alerts at most once.
//!
//! # Invariants
//! - The scheduler stays pure; notified-state bookkeeping lives here, in
//!   the caller's store, never in the window arithmetic.
//! - A tick is idempotent: re-running with unchanged inputs emits nothing
//!   new. Medications are evaluated independently, in no required order.
//! - The polling timer itself is owned by the caller (UI refresh loop, CLI
//!   `watch`); stopping it leaves no pending side effects.

use crate::model::medication::{DoseTime, MedicationId};
use crate::repo::medication_repo::{MedicationListQuery, MedicationRepository};
use crate::schedule::dose_window::previous_dose_at;
use crate::service::medication_service::MedicationServiceError;
use chrono::NaiveDateTime;
use log::info;
use serde::Serialize;
use uuid::Uuid;

/// One user-facing due alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoseAlert {
    pub medication_id: MedicationId,
    /// Display name for the alert body.
    pub name: String,
    /// Configured time-of-day anchor, for the alert body.
    pub dosage_time: DoseTime,
    /// The boundary that triggered this alert (current window start).
    pub due_at: NaiveDateTime,
}

/// Polling facade over a medication store.
pub struct ReminderService<R: MedicationRepository> {
    repo: R,
}

impl<R: MedicationRepository> ReminderService<R> {
    /// Creates a service using the provided store implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Evaluates one polling tick at `now`.
    ///
    /// A medication is due when the most recent crossed boundary (the start
    /// of its current window) is later than `last_notified_at`, or when it
    /// has never been alerted. Each emitted alert records
    /// `last_notified_at = now`, so the same boundary never alerts twice;
    /// the next alert comes with the next window.
    pub fn poll_due(
        &self,
        user_id: Option<Uuid>,
        now: NaiveDateTime,
    ) -> Result<Vec<DoseAlert>, MedicationServiceError> {
        let query = MedicationListQuery {
            user_id,
            ..MedicationListQuery::default()
        };

        let mut alerts = Vec::new();
        for medication in self.repo.list_medications(&query)? {
            let due_at = previous_dose_at(&medication, now);
            let already_alerted = medication
                .last_notified_at
                .is_some_and(|notified_at| notified_at >= due_at);
            if already_alerted {
                continue;
            }

            self.repo.record_notified(medication.uuid, now)?;
            info!(
                "event=dose_due module=service status=ok medication_id={} due_at={due_at}",
                medication.uuid
            );
            alerts.push(DoseAlert {
                medication_id: medication.uuid,
                name: medication.name.clone(),
                dosage_time: medication.dosage_time,
                due_at,
            });
        }

        Ok(alerts)
    }
}
