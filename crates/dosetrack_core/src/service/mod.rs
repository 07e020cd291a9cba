//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into use-case level APIs.
//! - Keep UI/CLI layers decoupled from storage and scheduling details.
//!
//! # Invariants
//! - Services never read the system clock; `now` is always a parameter.
//! - Services never bypass store validation/persistence contracts.

pub mod medication_service;
pub mod reminder_service;
