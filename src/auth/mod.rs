//! Credential lifecycle: turns a user-supplied master secret into a
//! short-lived API secret and tracks whether the session is authenticated.

use crate::api::KeyIssueRequest;
use crate::core::config::defaults::{DEFAULT_KEY_NAME, DEFAULT_KEY_PURPOSE, DEFAULT_USER_TAG};
use crate::core::error::{AuthError, TransportError};
use crate::core::store::{CredentialStore, SecretSlot};
use crate::core::transport::Transport;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Failed,
}

impl AuthState {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::Authenticating => "authenticating",
            AuthState::Authenticated => "authenticated",
            AuthState::Failed => "failed",
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body fields for API secret issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceSettings {
    pub key_name: String,
    pub user_id: Option<String>,
    pub purpose: Option<String>,
}

impl Default for IssuanceSettings {
    fn default() -> Self {
        Self {
            key_name: DEFAULT_KEY_NAME.to_string(),
            user_id: Some(DEFAULT_USER_TAG.to_string()),
            purpose: Some(DEFAULT_KEY_PURPOSE.to_string()),
        }
    }
}

impl IssuanceSettings {
    fn request(&self) -> KeyIssueRequest {
        KeyIssueRequest {
            name: self.key_name.clone(),
            user_id: self.user_id.clone(),
            metadata: self
                .purpose
                .as_ref()
                .map(|purpose| serde_json::json!({ "purpose": purpose })),
        }
    }
}

/// Result of a successful `login()`. Authentication stands even when the
/// follow-up issuance failed; that failure is reported here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginReport {
    pub issuance_error: Option<AuthError>,
}

#[derive(Debug)]
struct Session {
    state: AuthState,
    master_secret: Option<String>,
    api_secret: Option<String>,
    api_key_id: Option<String>,
    // Bumped on every login attempt and logout so in-flight work can tell
    // whether the session it started under still exists.
    generation: u64,
    // Bumped each time an issuance settles; callers that queued behind it
    // take `last_issuance` instead of issuing again.
    issuance_epoch: u64,
    last_issuance: Option<Result<String, AuthError>>,
    last_error: Option<AuthError>,
}

impl Session {
    fn new() -> Self {
        Self {
            state: AuthState::Unauthenticated,
            master_secret: None,
            api_secret: None,
            api_key_id: None,
            generation: 0,
            issuance_epoch: 0,
            last_issuance: None,
            last_error: None,
        }
    }

    /// A fresh unauthenticated session that keeps the counters moving.
    fn reset(&self) -> Self {
        Self {
            generation: self.generation + 1,
            issuance_epoch: self.issuance_epoch,
            ..Self::new()
        }
    }
}

/// Owns the single live credential session for an application instance.
pub struct CredentialManager {
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn Transport>,
    settings: IssuanceSettings,
    session: Mutex<Session>,
    issuance: tokio::sync::Mutex<()>,
}

impl CredentialManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
        settings: IssuanceSettings,
    ) -> Self {
        Self {
            store,
            transport,
            settings,
            session: Mutex::new(Session::new()),
            issuance: tokio::sync::Mutex::new(()),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> AuthState {
        self.session().state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == AuthState::Authenticated
    }

    /// True when an API secret is cached in memory.
    pub fn has_api_secret(&self) -> bool {
        self.session().api_secret.is_some()
    }

    /// Identifier of the API secret issued during this session, if any.
    pub fn api_key_id(&self) -> Option<String> {
        self.session().api_key_id.clone()
    }

    /// The most recent authentication failure, kept for the login surface.
    pub fn last_error(&self) -> Option<AuthError> {
        self.session().last_error.clone()
    }

    /// Reload persisted secrets at application start.
    ///
    /// A stored master secret is trusted without a probe; a stored API
    /// secret is only loaded alongside one.
    pub fn restore(&self) -> Result<AuthState, AuthError> {
        let mut session = self.session();
        if session.state != AuthState::Unauthenticated {
            return Err(AuthError::InvalidState(session.state));
        }

        let Some(master) = self.read_slot(SecretSlot::Master) else {
            debug!("no stored master key");
            return Ok(session.state);
        };

        session.master_secret = Some(master);
        session.api_secret = self.read_slot(SecretSlot::Api);
        session.state = AuthState::Authenticated;
        info!(
            has_api_key = session.api_secret.is_some(),
            "restored stored credentials"
        );
        Ok(session.state)
    }

    /// Validate `master_secret` against the backend and, on success, make
    /// it the session's master secret and try to issue an API secret.
    pub async fn login(&self, master_secret: &str) -> Result<LoginReport, AuthError> {
        let generation = {
            let mut session = self.session();
            match session.state {
                AuthState::Unauthenticated | AuthState::Failed => {}
                other => return Err(AuthError::InvalidState(other)),
            }
            session.generation += 1;
            session.state = AuthState::Authenticating;
            session.master_secret = Some(master_secret.to_string());
            session.last_issuance = None;
            session.last_error = None;
            session.generation
        };
        debug!("probing backend with candidate master key");

        let probe = if master_secret.trim().is_empty() {
            Err(AuthError::Authentication("master key is empty".to_string()))
        } else {
            self.transport
                .probe(master_secret)
                .await
                .map_err(describe_probe_failure)
        };

        {
            let mut session = self.session();
            if session.generation != generation {
                return Err(AuthError::Authentication(
                    "session was reset during login".to_string(),
                ));
            }
            if let Err(err) = probe {
                warn!(error = %err, "master key rejected");
                session.state = AuthState::Failed;
                session.master_secret = None;
                session.last_error = Some(err.clone());
                return Err(err);
            }
            session.state = AuthState::Authenticated;
            if let Err(err) = self.store.set(SecretSlot::Master, master_secret) {
                warn!(error = %err, "failed to persist master key");
            }
        }
        info!("authenticated");

        let issuance_error = match self.ensure_api_secret().await {
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "API key issuance after login failed");
                Some(err)
            }
        };
        Ok(LoginReport { issuance_error })
    }

    /// Return the cached API secret, issuing one if none exists.
    ///
    /// Concurrent callers share a single issuance: the first one performs
    /// the network call while the rest wait and then receive its result,
    /// success or failure.
    pub async fn ensure_api_secret(&self) -> Result<String, AuthError> {
        let observed_epoch = {
            let session = self.session();
            if session.state != AuthState::Authenticated {
                return Err(AuthError::NotAuthenticated);
            }
            if let Some(secret) = &session.api_secret {
                return Ok(secret.clone());
            }
            session.issuance_epoch
        };

        let _issuing = self.issuance.lock().await;

        let (master, generation) = {
            let mut session = self.session();
            if session.state != AuthState::Authenticated {
                return Err(AuthError::NotAuthenticated);
            }
            if let Some(secret) = &session.api_secret {
                return Ok(secret.clone());
            }
            if session.issuance_epoch != observed_epoch {
                if let Some(outcome) = &session.last_issuance {
                    return outcome.clone();
                }
            }
            if let Some(secret) = self.read_slot(SecretSlot::Api) {
                session.api_secret = Some(secret.clone());
                return Ok(secret);
            }
            match &session.master_secret {
                Some(master) => (master.clone(), session.generation),
                None => return Err(AuthError::NotAuthenticated),
            }
        };

        debug!("issuing API key");
        let issued = match self
            .transport
            .issue_key(&master, &self.settings.request())
            .await
        {
            Ok(issued) if issued.key.is_empty() => Err(AuthError::Issuance(
                "backend returned an empty key".to_string(),
            )),
            Ok(issued) => Ok(issued),
            Err(err) => Err(AuthError::Issuance(err.to_string())),
        };

        // Store writes happen under the session guard so a concurrent
        // logout either sees the key persisted and clears it, or wins first.
        let mut session = self.session();
        if session.generation != generation || session.state != AuthState::Authenticated {
            debug!("discarding API key issued for a session that no longer exists");
            return Err(AuthError::NotAuthenticated);
        }
        let outcome = match issued {
            Ok(issued) => {
                if let Err(err) = self.store.set(SecretSlot::Api, &issued.key) {
                    warn!(error = %err, "failed to persist API key");
                }
                info!(key_id = %issued.key_id, "API key issued");
                session.api_secret = Some(issued.key.clone());
                session.api_key_id = Some(issued.key_id);
                Ok(issued.key)
            }
            Err(err) => {
                warn!(error = %err, "API key issuance failed");
                Err(err)
            }
        };
        session.issuance_epoch += 1;
        session.last_issuance = Some(outcome.clone());
        outcome
    }

    /// Forget both secrets, in memory and in the store. Idempotent.
    pub fn logout(&self) {
        let mut session = self.session();
        *session = session.reset();
        for slot in [SecretSlot::Api, SecretSlot::Master] {
            if let Err(err) = self.store.clear(slot) {
                warn!(slot = slot.storage_name(), error = %err, "failed to clear stored secret");
            }
        }
        info!("logged out");
    }

    fn read_slot(&self, slot: SecretSlot) -> Option<String> {
        match self.store.get(slot) {
            Ok(value) => value.filter(|secret| !secret.is_empty()),
            Err(err) => {
                warn!(slot = slot.storage_name(), error = %err, "failed to read stored secret");
                None
            }
        }
    }
}

fn describe_probe_failure(err: TransportError) -> AuthError {
    let cause = match err {
        TransportError::Status { status, detail } => {
            format!("invalid master key ({status}: {detail})")
        }
        TransportError::Network(cause) => format!("backend unreachable: {cause}"),
        TransportError::Malformed(cause) => cause,
    };
    AuthError::Authentication(cause)
}
