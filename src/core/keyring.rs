use crate::core::store::{CredentialStore, SecretSlot};
use keyring::Entry;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_KEYRING_SERVICE: &str = "cortex";

/// Describes failures when attempting to access the system keyring.
///
/// Recoverable errors indicate that the credential backend was
/// temporarily unavailable (for example when the keychain service is
/// locked or inaccessible). Permanent errors surface the underlying
/// cause directly so callers can report them to the user.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store temporarily unavailable: {0}")]
    Recoverable(#[source] keyring::Error),
    #[error("credential store error: {0}")]
    Permanent(#[source] keyring::Error),
}

impl StoreError {
    /// Returns true when the error represents a temporary outage of the
    /// platform keyring backend.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::Recoverable(_))
    }
}

impl From<keyring::Error> for StoreError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                StoreError::Recoverable(err)
            }
            other => StoreError::Permanent(other),
        }
    }
}

/// [`CredentialStore`] backed by the platform keyring. Each slot is one
/// keyring entry under a shared service name.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, slot: SecretSlot) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, slot.storage_name())?)
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_KEYRING_SERVICE)
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self, slot: SecretSlot) -> Result<Option<String>, StoreError> {
        match self.entry(slot)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => {
                debug!(slot = slot.storage_name(), "keyring entry missing");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, slot: SecretSlot, value: &str) -> Result<(), StoreError> {
        self.entry(slot)?.set_password(value)?;
        Ok(())
    }

    fn clear(&self, slot: SecretSlot) -> Result<(), StoreError> {
        match self.entry(slot)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
