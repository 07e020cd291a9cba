//! Record-store abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the medication store contract consumed by services.
//! - Isolate SQLite query details from business orchestration.
//!
//! # Invariants
//! - Write paths must enforce `Medication::validate()` before persistence.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - Store APIs return semantic errors (`NotFound`) in addition to
//!   transport errors.

pub mod medication_repo;
pub mod memory_repo;
