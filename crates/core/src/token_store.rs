//! Single source of truth for the current bearer credential

use crate::config::AuthConfig;
use crate::credential::Credential;
use crate::storage::{CredentialStorage, MemoryStorage};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Credential together with the generation it was stored under.
///
/// The generation increases on every replacement, so a reader holding an
/// older snapshot can tell that the credential has since changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub credential: Option<Credential>,
    pub generation: u64,
}

/// Process-wide holder of the current credential.
///
/// Reads and replacements are atomic: a reader sees either the old or the new
/// credential, never a mix. Every change is written through to the backing
/// [`CredentialStorage`]; a storage failure is logged and otherwise ignored.
pub struct TokenStore {
    current: ArcSwap<TokenSnapshot>,
    storage: Arc<dyn CredentialStorage>,
}

impl TokenStore {
    /// Create an empty store backed by `storage`
    pub fn new(storage: Arc<dyn CredentialStorage>) -> Self {
        Self {
            current: ArcSwap::from_pointee(TokenSnapshot::default()),
            storage,
        }
    }

    /// Create an empty store that persists nothing beyond the process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Load the persisted credential, if any, into the store
    pub fn load(&self) -> Option<Credential> {
        let stored = match self.storage.get(AuthConfig::TOKEN_KEY) {
            Ok(stored) => stored.filter(|token| !token.is_empty()),
            Err(e) => {
                warn!("Failed to read persisted credential: {e}");
                None
            }
        };

        let credential = stored.map(Credential::new);
        if credential.is_some() {
            debug!("Loaded persisted credential");
            self.swap_in(credential.clone());
        }
        credential
    }

    /// Current credential
    pub fn get(&self) -> Option<Credential> {
        self.current.load().credential.clone()
    }

    /// Current credential and its generation, read atomically
    pub fn snapshot(&self) -> Arc<TokenSnapshot> {
        self.current.load_full()
    }

    /// Generation of the current credential
    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Replace the current credential
    pub fn set(&self, credential: Credential) {
        if let Err(e) = self.storage.set(AuthConfig::TOKEN_KEY, credential.as_str()) {
            warn!("Failed to persist credential: {e}");
        }
        self.swap_in(Some(credential));
    }

    /// Remove the current credential
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(AuthConfig::TOKEN_KEY) {
            warn!("Failed to remove persisted credential: {e}");
        }
        if self.current.load().credential.is_some() {
            self.swap_in(None);
        }
    }

    /// Backing storage, shared with callers that persist related session data
    pub fn storage(&self) -> &Arc<dyn CredentialStorage> {
        &self.storage
    }

    fn swap_in(&self, credential: Option<Credential>) {
        self.current.rcu(|old| TokenSnapshot {
            credential: credential.clone(),
            generation: old.generation + 1,
        });
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("current", &self.current.load())
            .finish_non_exhaustive()
    }
}
