//! An explicit registry of clients keyed by credential.
//!
//! A process that configures flags in several places (e.g., multiple request handlers sharing
//! one secret key) should share a single client so the snapshot, overrides and throttle state
//! are shared too. The registry makes that sharing an explicit object with a defined lifetime:
//! create it at application start, drop it to tear all clients down.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{ClientConfig, FlagsClient, Result};

/// A registry of [`FlagsClient`] instances keyed by secret key.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, Arc<FlagsClient>>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> ClientRegistry {
        ClientRegistry::default()
    }

    /// Get the client registered for `secret_key`, if any.
    pub fn get(&self, secret_key: &str) -> Option<Arc<FlagsClient>> {
        self.lock().get(secret_key).cloned()
    }

    /// Get the client for `secret_key`, creating it from `config()` on first use.
    ///
    /// The configuration closure is only invoked when no client exists for the key yet.
    pub fn get_or_create(
        &self,
        secret_key: &str,
        config: impl FnOnce() -> ClientConfig,
    ) -> Result<Arc<FlagsClient>> {
        let mut clients = self.lock();
        if let Some(client) = clients.get(secret_key) {
            return Ok(Arc::clone(client));
        }

        let client = Arc::new(config().to_client()?);
        clients.insert(secret_key.to_owned(), Arc::clone(&client));
        Ok(client)
    }

    /// Remove and return the client registered for `secret_key`.
    pub fn remove(&self, secret_key: &str) -> Option<Arc<FlagsClient>> {
        self.lock().remove(secret_key)
    }

    /// Remove all clients.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<FlagsClient>>> {
        self.clients
            .lock()
            .expect("thread holding registry lock should not panic")
    }
}
