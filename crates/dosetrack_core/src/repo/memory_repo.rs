//! Ephemeral in-memory medication store.
//!
//! # Responsibility
//! - Back demo mode (no data directory configured) and tests with the same
//!   store contract as the SQLite implementation.
//!
//! # Invariants
//! - Semantics mirror `SqliteMedicationRepository`: validated writes,
//!   `NotFound` for missing rows, stable `created_at ASC, uuid ASC` order.
//! - Contents do not survive the process; persistence is the point of the
//!   SQLite store, not this one.

use crate::model::medication::{Medication, MedicationId};
use crate::repo::medication_repo::{
    MedicationListQuery, MedicationRepository, RepoError, RepoResult,
};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory medication store keyed by stable ID.
#[derive(Default)]
pub struct MemoryMedicationRepository {
    rows: Mutex<BTreeMap<MedicationId, Medication>>,
}

impl MemoryMedicationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> MutexGuard<'_, BTreeMap<MedicationId, Medication>> {
        match self.rows.lock() {
            Ok(guard) => guard,
            // A poisoned lock only means another thread panicked mid-write;
            // the map itself is still structurally sound.
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn mutate_active(
        &self,
        id: MedicationId,
        apply: impl FnOnce(&mut Medication),
    ) -> RepoResult<()> {
        let mut rows = self.rows();
        match rows.get_mut(&id).filter(|row| row.is_active()) {
            Some(row) => {
                apply(row);
                Ok(())
            }
            None => Err(RepoError::NotFound(id)),
        }
    }
}

impl MedicationRepository for MemoryMedicationRepository {
    fn create_medication(&self, medication: &Medication) -> RepoResult<MedicationId> {
        medication.validate()?;
        self.rows().insert(medication.uuid, medication.clone());
        Ok(medication.uuid)
    }

    fn update_medication(&self, medication: &Medication) -> RepoResult<()> {
        medication.validate()?;
        let mut rows = self.rows();
        match rows.get_mut(&medication.uuid) {
            Some(row) => {
                *row = medication.clone();
                Ok(())
            }
            None => Err(RepoError::NotFound(medication.uuid)),
        }
    }

    fn get_medication(
        &self,
        id: MedicationId,
        include_deleted: bool,
    ) -> RepoResult<Option<Medication>> {
        Ok(self
            .rows()
            .get(&id)
            .filter(|row| include_deleted || row.is_active())
            .cloned())
    }

    fn list_medications(&self, query: &MedicationListQuery) -> RepoResult<Vec<Medication>> {
        let needle = query
            .name_contains
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
            .map(str::to_lowercase);

        let mut matches: Vec<Medication> = self
            .rows()
            .values()
            .filter(|row| query.include_deleted || row.is_active())
            .filter(|row| query.user_id.map_or(true, |user_id| row.user_id == user_id))
            .filter(|row| {
                needle
                    .as_deref()
                    .map_or(true, |needle| row.name.to_lowercase().contains(needle))
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.uuid.cmp(&b.uuid))
        });

        let offset = query.offset as usize;
        let page: Vec<Medication> = match query.limit {
            Some(limit) => matches
                .into_iter()
                .skip(offset)
                .take(limit as usize)
                .collect(),
            None => matches.into_iter().skip(offset).collect(),
        };

        Ok(page)
    }

    fn mark_taken(&self, id: MedicationId, at: NaiveDateTime) -> RepoResult<()> {
        self.mutate_active(id, |row| row.mark_taken(at))
    }

    fn record_notified(&self, id: MedicationId, at: NaiveDateTime) -> RepoResult<()> {
        self.mutate_active(id, |row| row.record_notified(at))
    }

    fn soft_delete_medication(&self, id: MedicationId) -> RepoResult<()> {
        let mut rows = self.rows();
        match rows.get_mut(&id) {
            Some(row) => {
                row.soft_delete();
                Ok(())
            }
            None => Err(RepoError::NotFound(id)),
        }
    }
}
