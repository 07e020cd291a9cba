//! Medication domain model.
//!
//! # Responsibility
//! - Define the canonical record the dose scheduler and stores operate on.
//! - Validate schedule configuration before it reaches window arithmetic.
//! - Provide lifecycle helpers for taken/notified timestamps and soft delete.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another medication.
//! - `periodicity_hours` is finite, positive, and at most one year; window
//!   arithmetic downstream divides by it and relies on this bound.
//! - `is_deleted` is the source of truth for tombstone state.
//! - Timestamps are local naive wall-clock values supplied by callers.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for every medication record.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type MedicationId = Uuid;

/// Upper bound for the repeat interval, in hours (one year).
pub const MAX_PERIODICITY_HOURS: f64 = 8760.0;
/// Lower bound for the repeat interval, in hours (one minute).
pub const MIN_PERIODICITY_HOURS: f64 = 1.0 / 60.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

static DOSE_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]?\d|2[0-3]):([0-5]\d)$").expect("valid dose time regex"));

/// Validation errors for medication schedule configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum MedicationValidationError {
    /// Name is empty after trimming.
    EmptyName,
    /// Dose time text does not match `HH:MM` within 00:00..=23:59.
    InvalidDoseTime(String),
    /// Repeat interval is NaN, infinite, zero or negative.
    NonPositivePeriodicity(f64),
    /// Repeat interval is below [`MIN_PERIODICITY_HOURS`].
    PeriodicityTooShort(f64),
    /// Repeat interval exceeds [`MAX_PERIODICITY_HOURS`].
    PeriodicityTooLong(f64),
}

impl Display for MedicationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "medication name must not be empty"),
            Self::InvalidDoseTime(value) => {
                write!(f, "dose time must be HH:MM between 00:00 and 23:59, got `{value}`")
            }
            Self::NonPositivePeriodicity(hours) => {
                write!(f, "repeat interval must be a positive number of hours, got {hours}")
            }
            Self::PeriodicityTooShort(hours) => write!(
                f,
                "repeat interval must be at least {MIN_PERIODICITY_HOURS:.4} hours, got {hours}"
            ),
            Self::PeriodicityTooLong(hours) => write!(
                f,
                "repeat interval must be at most {MAX_PERIODICITY_HOURS} hours, got {hours}"
            ),
        }
    }
}

impl Error for MedicationValidationError {}

/// Time-of-day anchor for the first dose of each calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DoseTime {
    /// Hour in 0..=23.
    pub hour: u8,
    /// Minute in 0..=59.
    pub minute: u8,
}

impl DoseTime {
    /// Creates a dose time, rejecting out-of-range components.
    pub fn new(hour: u8, minute: u8) -> Result<Self, MedicationValidationError> {
        if hour > 23 || minute > 59 {
            return Err(MedicationValidationError::InvalidDoseTime(format!(
                "{hour:02}:{minute:02}"
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Returns the anchor as a time within a calendar day.
    pub fn as_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .expect("dose time components are range-checked on construction")
    }
}

impl Display for DoseTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for DoseTime {
    type Err = MedicationValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let captures = DOSE_TIME_RE
            .captures(trimmed)
            .ok_or_else(|| MedicationValidationError::InvalidDoseTime(trimmed.to_string()))?;
        // Regex constrains both groups to in-range two-digit numbers.
        let hour: u8 = captures[1].parse().expect("regex-matched hour");
        let minute: u8 = captures[2].parse().expect("regex-matched minute");
        Ok(Self { hour, minute })
    }
}

/// Whether a medication is a permanent routine or a finite course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicationCategory {
    /// Taken indefinitely as part of the daily routine.
    Ongoing,
    /// Taken for a bounded treatment course.
    Temporary,
}

/// Canonical medication record.
///
/// The scheduler only ever reads `dosage_time`, `periodicity_hours` and
/// `last_taken_at` together with a caller-supplied instant; everything else
/// belongs to CRUD, rendering and notification bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    /// Stable global ID used for linking and store lookups.
    pub uuid: MedicationId,
    /// Owning user profile.
    pub user_id: Uuid,
    /// Display name, non-empty after trimming.
    pub name: String,
    /// Anchor time-of-day for the first dose of each day.
    pub dosage_time: DoseTime,
    /// Repeat interval in hours; windows tile time with this length.
    pub periodicity_hours: f64,
    /// Routine vs. finite-course classification.
    pub category: MedicationCategory,
    /// Free-form usage notes.
    pub notes: String,
    /// Instant the user last confirmed a dose, if ever.
    pub last_taken_at: Option<NaiveDateTime>,
    /// Instant a due alert was last raised; owned by the notification caller.
    pub last_notified_at: Option<NaiveDateTime>,
    /// Creation instant supplied by the caller.
    pub created_at: NaiveDateTime,
    /// Soft delete tombstone.
    pub is_deleted: bool,
}

impl Medication {
    /// Creates a new medication with a generated stable ID.
    pub fn new(
        user_id: Uuid,
        name: impl Into<String>,
        dosage_time: DoseTime,
        periodicity_hours: f64,
        created_at: NaiveDateTime,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4(),
            user_id,
            name,
            dosage_time,
            periodicity_hours,
            created_at,
        )
    }

    /// Creates a medication with a caller-provided stable ID.
    ///
    /// Used by store read paths and import flows where identity already
    /// exists. Does not validate; call `validate()` before persisting.
    pub fn with_id(
        uuid: MedicationId,
        user_id: Uuid,
        name: impl Into<String>,
        dosage_time: DoseTime,
        periodicity_hours: f64,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            uuid,
            user_id,
            name: name.into(),
            dosage_time,
            periodicity_hours,
            category: MedicationCategory::Temporary,
            notes: String::new(),
            last_taken_at: None,
            last_notified_at: None,
            created_at,
            is_deleted: false,
        }
    }

    /// Checks schedule configuration invariants.
    ///
    /// # Errors
    /// - `EmptyName` when the trimmed name is empty.
    /// - `NonPositivePeriodicity` for NaN, infinite, zero or negative values.
    /// - `PeriodicityTooShort` / `PeriodicityTooLong` for out-of-range values.
    pub fn validate(&self) -> Result<(), MedicationValidationError> {
        if self.name.trim().is_empty() {
            return Err(MedicationValidationError::EmptyName);
        }
        if !self.periodicity_hours.is_finite() || self.periodicity_hours <= 0.0 {
            return Err(MedicationValidationError::NonPositivePeriodicity(
                self.periodicity_hours,
            ));
        }
        if self.periodicity_hours < MIN_PERIODICITY_HOURS {
            return Err(MedicationValidationError::PeriodicityTooShort(
                self.periodicity_hours,
            ));
        }
        if self.periodicity_hours > MAX_PERIODICITY_HOURS {
            return Err(MedicationValidationError::PeriodicityTooLong(
                self.periodicity_hours,
            ));
        }
        Ok(())
    }

    /// Returns the repeat interval as a duration, rounded to milliseconds.
    pub fn period(&self) -> Duration {
        Duration::milliseconds((self.periodicity_hours * MILLIS_PER_HOUR).round() as i64)
    }

    /// Records a user-confirmed dose at the given instant.
    pub fn mark_taken(&mut self, at: NaiveDateTime) {
        self.last_taken_at = Some(at);
    }

    /// Records that a due alert was raised at the given instant.
    pub fn record_notified(&mut self, at: NaiveDateTime) {
        self.last_notified_at = Some(at);
    }

    /// Marks this medication as softly deleted (tombstoned).
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    /// Clears the soft delete flag.
    pub fn restore(&mut self) {
        self.is_deleted = false;
    }

    /// Returns whether this medication should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}
