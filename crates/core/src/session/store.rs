use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use tracing::{info, warn};

use super::persistence::{SessionPersistence, SessionRecord};
use crate::{
    api::ApiClient,
    error::AuthError,
    models::{Credentials, UserIdentity},
};

/// Minimum password length the backend accepts at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Snapshot of what the client believes about the current session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionBelief {
    /// A user record is cached.
    pub is_present: bool,
    /// Email to show in headers; empty when absent.
    pub display_email: String,
}

/// Owner of the cached session belief.
///
/// The belief is advisory. The real credential is an HttpOnly cookie held
/// by the transport and only the server can judge it, so the belief is
/// written on exactly two paths: the user's own login/logout, and
/// [`SessionStore::invalidate`] after the server reported the session as
/// expired.
pub struct SessionStore {
    api: ApiClient,
    persistence: Arc<dyn SessionPersistence>,
    record: RwLock<Option<SessionRecord>>,
}

impl SessionStore {
    /// Build a store, reading any previously persisted record once.
    pub fn new(api: ApiClient, persistence: Arc<dyn SessionPersistence>) -> Self {
        let record = match persistence.load() {
            Ok(record) => record,
            Err(err) => {
                warn!(?err, "Discarding unreadable session record");
                None
            }
        };
        Self {
            api,
            persistence,
            record: RwLock::new(record),
        }
    }

    /// Synchronous read of the cached belief; performs no I/O.
    pub fn current_belief(&self) -> SessionBelief {
        match self.record.read().as_ref() {
            Some(record) => SessionBelief {
                is_present: true,
                display_email: record.email.clone(),
            },
            None => SessionBelief::default(),
        }
    }

    /// Authenticate and cache the returned identity. Does not navigate.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserIdentity, AuthError> {
        validate_login(credentials)?;
        let user = self.api.login(credentials).await?;
        self.write(Some(SessionRecord {
            email: user.email.clone(),
        }));
        info!(email = %user.email, "Logged in");
        Ok(user)
    }

    /// End the session.
    ///
    /// The local belief is cleared whatever the server answers; a failed
    /// call is still returned so the caller can report it.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let result = self.api.logout().await;
        self.write(None);
        match result {
            Ok(()) => {
                info!("Logged out");
                Ok(())
            }
            Err(err) => {
                warn!(%err, "Logout call failed; local session cleared anyway");
                Err(err.into())
            }
        }
    }

    /// Create an account. The belief is left untouched.
    pub async fn register(&self, credentials: &Credentials) -> Result<(), AuthError> {
        validate_registration(credentials)?;
        self.api.register(credentials).await?;
        info!(email = %credentials.email, "Registered account");
        Ok(())
    }

    /// Drop the belief after the server rejected the session cookie.
    pub fn invalidate(&self) {
        if self.record.read().is_none() {
            return;
        }
        warn!("Server rejected the session; clearing local belief");
        self.write(None);
    }

    fn write(&self, record: Option<SessionRecord>) {
        let persisted = match &record {
            Some(record) => self.persistence.store(record),
            None => self.persistence.clear(),
        };
        if let Err(err) = persisted {
            warn!(?err, "Failed to persist session record");
        }
        *self.record.write() = record;
    }
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex"));

/// Form check applied before `/login` is called.
pub fn validate_login(credentials: &Credentials) -> Result<(), AuthError> {
    if !EMAIL_RE.is_match(&credentials.email) {
        return Err(AuthError::InvalidInput(
            "Enter a valid email address".to_string(),
        ));
    }
    if credentials.password.is_empty() {
        return Err(AuthError::InvalidInput("Password is required".to_string()));
    }
    Ok(())
}

/// Form check applied before `/register` is called.
pub fn validate_registration(credentials: &Credentials) -> Result<(), AuthError> {
    validate_login(credentials)?;
    if credentials.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
