//! Local demo session provider.
//!
//! Fallback used when no hosted backend is configured: the session lives in
//! process memory and the profile id is derived deterministically from the
//! email, so the same address maps to the same records across runs.

use crate::auth::{AuthError, AuthProvider, UserProfile};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// In-process demo auth provider.
#[derive(Default)]
pub struct DemoAuthProvider {
    session: Mutex<Option<UserProfile>>,
}

impl DemoAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self) -> MutexGuard<'_, Option<UserProfile>> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl AuthProvider for DemoAuthProvider {
    fn sign_in(&self, email: &str) -> Result<UserProfile, AuthError> {
        let normalized = email.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(AuthError::EmptyEmail);
        }
        if !EMAIL_RE.is_match(&normalized) {
            return Err(AuthError::MalformedEmail(normalized));
        }

        let profile = UserProfile {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, normalized.as_bytes()),
            email: normalized,
        };
        info!(
            "event=auth_sign_in module=auth status=ok provider=demo profile_id={}",
            profile.id
        );

        *self.session() = Some(profile.clone());
        Ok(profile)
    }

    fn sign_out(&self) {
        let had_session = self.session().take().is_some();
        info!("event=auth_sign_out module=auth status=ok provider=demo had_session={had_session}");
    }

    fn current_user(&self) -> Option<UserProfile> {
        self.session().clone()
    }
}
