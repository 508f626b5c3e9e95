//! The two secrets the client persists, behind an injectable capability.

use crate::core::keyring::StoreError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretSlot {
    Master,
    Api,
}

impl SecretSlot {
    pub fn storage_name(self) -> &'static str {
        match self {
            SecretSlot::Master => "cortex-master-key",
            SecretSlot::Api => "cortex-api-key",
        }
    }
}

/// Get/set/clear for the two named secrets. Writes are last-write-wins.
pub trait CredentialStore: Send + Sync {
    fn get(&self, slot: SecretSlot) -> Result<Option<String>, StoreError>;
    fn set(&self, slot: SecretSlot, value: &str) -> Result<(), StoreError>;
    fn clear(&self, slot: SecretSlot) -> Result<(), StoreError>;
}

/// Non-durable store for hosts without a keyring.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slots: Mutex<HashMap<SecretSlot, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, slot: SecretSlot, value: impl Into<String>) -> Self {
        self.slots().insert(slot, value.into());
        self
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<SecretSlot, String>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, slot: SecretSlot) -> Result<Option<String>, StoreError> {
        Ok(self.slots().get(&slot).cloned())
    }

    fn set(&self, slot: SecretSlot, value: &str) -> Result<(), StoreError> {
        self.slots().insert(slot, value.to_string());
        Ok(())
    }

    fn clear(&self, slot: SecretSlot) -> Result<(), StoreError> {
        self.slots().remove(&slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_independent() {
        let store = MemoryCredentialStore::new();
        store.set(SecretSlot::Master, "master").expect("set master");
        store.set(SecretSlot::Api, "api").expect("set api");
        store.clear(SecretSlot::Api).expect("clear api");

        assert_eq!(store.get(SecretSlot::Master).unwrap().as_deref(), Some("master"));
        assert_eq!(store.get(SecretSlot::Api).unwrap(), None);
    }

    #[test]
    fn clearing_a_missing_slot_succeeds() {
        let store = MemoryCredentialStore::new();
        assert!(store.clear(SecretSlot::Master).is_ok());
    }

    #[test]
    fn storage_names_are_stable() {
        assert_eq!(SecretSlot::Master.storage_name(), "cortex-master-key");
        assert_eq!(SecretSlot::Api.storage_name(), "cortex-api-key");
    }

    #[test]
    fn writes_survive_a_poisoned_lock() {
        let store = std::sync::Arc::new(MemoryCredentialStore::new());
        let holder = store.clone();
        let _ = std::thread::spawn(move || {
            let _slots = holder.slots.lock().unwrap();
            panic!("panic while holding the slot map");
        })
        .join();
        assert!(store.slots.is_poisoned());

        store.set(SecretSlot::Api, "api").expect("set api");
        assert_eq!(store.get(SecretSlot::Api).unwrap().as_deref(), Some("api"));
        store.clear(SecretSlot::Api).expect("clear api");
        assert_eq!(store.get(SecretSlot::Api).unwrap(), None);
    }
}
