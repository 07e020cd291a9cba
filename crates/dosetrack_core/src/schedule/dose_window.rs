//! Dose window arithmetic and derived taken state.
//!
//! # Responsibility
//! - Compute the boundaries of the dose window bracketing an instant.
//! - Derive remaining percentage, remaining-time label and taken state.
//!
//! # Invariants
//! - All functions are deterministic in their inputs; `now` is always a
//!   parameter and the system clock is never read here.
//! - Windows tile time contiguously with length `period`, anchored at
//!   `dosage_time` on the day of `now` and extended without bound in both
//!   directions.
//! - Boundary math is direct arithmetic, never iterative stepping, so it
//!   stays O(1) for anchors arbitrarily far from `now`.
//!
//! Callers are expected to pass validated medications; see
//! `Medication::validate`.

use crate::model::medication::Medication;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Label produced for a dose whose window boundary has been reached.
pub const DUE_NOW_LABEL: &str = "due now";

/// Reset rule for the derived taken state.
///
/// The two rules disagree when a dose is taken shortly after midnight for a
/// window that started the previous day, so the choice is explicit and
/// selected once per process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakenResetRule {
    /// Taken iff `last_taken_at` falls within the current window. Canonical.
    #[default]
    StrictSlot,
    /// For daily-or-faster schedules (period <= 24h), additionally requires
    /// `last_taken_at` to be on the same calendar day as `now`, so daily
    /// medications revert to pending at local midnight even mid-window.
    MidnightReset,
}

impl TakenResetRule {
    /// Stable string id used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrictSlot => "strict_slot",
            Self::MidnightReset => "midnight_reset",
        }
    }
}

impl Display for TakenResetRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse error for [`TakenResetRule`] configuration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTakenResetRule(pub String);

impl Display for UnknownTakenResetRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown taken reset rule `{}`; expected strict_slot|midnight_reset",
            self.0
        )
    }
}

impl Error for UnknownTakenResetRule {}

impl FromStr for TakenResetRule {
    type Err = UnknownTakenResetRule;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict_slot" => Ok(Self::StrictSlot),
            "midnight_reset" => Ok(Self::MidnightReset),
            other => Err(UnknownTakenResetRule(other.to_string())),
        }
    }
}

/// The half-open interval `[start, end)` during which exactly one dose is
/// expected to be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseWindow {
    /// Most recent boundary at or before the bracketed instant.
    pub start: NaiveDateTime,
    /// Earliest boundary strictly after the bracketed instant.
    pub end: NaiveDateTime,
}

impl DoseWindow {
    /// Window length; equals the medication's repeat interval.
    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    /// Whether the instant falls within `[start, end)`.
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Earliest dose boundary strictly after `now`.
///
/// The anchor is `dosage_time` on the day of `now`; boundaries repeat every
/// period in both directions from it. Computed as
/// `now + (period - (now - anchor) mod period)`, which lands strictly after
/// `now` even when `now` sits exactly on a boundary.
pub fn next_dose_at(medication: &Medication, now: NaiveDateTime) -> NaiveDateTime {
    let period_ms = medication.period().num_milliseconds();
    debug_assert!(period_ms > 0, "medication must be validated before scheduling");

    let anchor = now.date().and_time(medication.dosage_time.as_naive_time());
    let offset_ms = (now - anchor).num_milliseconds().rem_euclid(period_ms);
    now + Duration::milliseconds(period_ms - offset_ms)
}

/// Most recent dose boundary at or before `now`; start of the current window.
pub fn previous_dose_at(medication: &Medication, now: NaiveDateTime) -> NaiveDateTime {
    next_dose_at(medication, now) - medication.period()
}

/// The dose window bracketing `now`.
pub fn current_window(medication: &Medication, now: NaiveDateTime) -> DoseWindow {
    let end = next_dose_at(medication, now);
    DoseWindow {
        start: end - medication.period(),
        end,
    }
}

/// Fraction of the current window still remaining, in `[0, 100]`.
///
/// 100 the instant a window starts, monotonically non-increasing as `now`
/// advances, and snapping back to 100 when the boundary is crossed.
pub fn remaining_percentage(medication: &Medication, now: NaiveDateTime) -> f64 {
    let window = current_window(medication, now);
    let total_ms = window.length().num_milliseconds() as f64;
    let remaining_ms = (window.end - now).num_milliseconds() as f64;
    (remaining_ms / total_ms * 100.0).clamp(0.0, 100.0)
}

/// Renders a remaining duration as a short countdown label.
///
/// Durations at or below zero collapse to [`DUE_NOW_LABEL`]; otherwise the
/// label is `"{h}h {m}m"`, with the hour part omitted when zero.
pub fn format_remaining(remaining: Duration) -> String {
    if remaining <= Duration::zero() {
        return DUE_NOW_LABEL.to_string();
    }
    let hours = remaining.num_hours();
    let minutes = remaining.num_minutes() % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Derived taken state for the current window.
///
/// True iff a dose was confirmed within `[start, end)` of the window
/// bracketing `now`, subject to the reset rule. Never stored: the predicate
/// reverts to false on its own once `now` crosses the window boundary.
pub fn is_dose_taken(medication: &Medication, now: NaiveDateTime, rule: TakenResetRule) -> bool {
    let Some(last_taken) = medication.last_taken_at else {
        return false;
    };

    if rule == TakenResetRule::MidnightReset
        && medication.periodicity_hours <= 24.0
        && last_taken.date() != now.date()
    {
        return false;
    }

    let window = current_window(medication, now);
    last_taken >= window.start && now < window.end
}
