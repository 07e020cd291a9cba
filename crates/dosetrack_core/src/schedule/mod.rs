//! Dose window derivation.
//!
//! # Responsibility
//! - Derive dose-window state from a medication's schedule and an instant.
//! - Stay pure: no clock reads, no I/O, no stored state.
//!
//! # Invariants
//! - For any instant, exactly one window brackets it: `start <= now < end`.
//! - Taken state is recomputed from `last_taken_at`, never stored as a flag.

pub mod dose_window;
