//! Auth-provider capability seam.
//!
//! # Responsibility
//! - Define the session contract the application signs in through.
//! - Keep the hosted identity service behind a pluggable trait; only the
//!   local demo fallback lives in this crate.
//!
//! # Invariants
//! - Profile ids are stable for a given email.
//! - Providers never log raw email addresses, only profile metadata.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod demo;

/// Signed-in user profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Stable profile id.
    pub id: Uuid,
    /// Normalized sign-in email.
    pub email: String,
}

/// Auth errors surfaced to the sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Email is empty after trimming.
    EmptyEmail,
    /// Email does not look like `local@domain.tld`.
    MalformedEmail(String),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::MalformedEmail(value) => write!(f, "email is malformed: `{value}`"),
        }
    }
}

impl Error for AuthError {}

/// Session provider contract.
///
/// Implementations hold the current session; the hosted identity backend
/// is one implementation of this seam, the local demo provider another.
pub trait AuthProvider {
    /// Establishes a session for the given email.
    fn sign_in(&self, email: &str) -> Result<UserProfile, AuthError>;
    /// Tears down the current session, if any.
    fn sign_out(&self);
    /// Returns the signed-in profile, if a session is active.
    fn current_user(&self) -> Option<UserProfile>;
}
