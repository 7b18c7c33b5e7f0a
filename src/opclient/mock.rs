//! In-memory secret-manager backend for tests.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;

use super::{use_client, SecretClient};
use crate::config::item::Item;
use crate::error::{Error, Result};

#[derive(Default)]
pub struct MockClient {
    items: Mutex<HashMap<(String, String), Item>>,
    writes: Mutex<usize>,
}

impl MockClient {
    pub fn new() -> MockClient {
        MockClient::default()
    }

    /// Seeds an item directly, bypassing the client interface.
    pub fn put(&self, vault: &str, item: Item) {
        let mut items = self.items.lock().unwrap();
        items.insert((vault.to_string(), item.title.clone()), item);
    }

    pub fn item(&self, vault: &str, name: &str) -> Option<Item> {
        let items = self.items.lock().unwrap();
        items.get(&(vault.to_string(), name.to_string())).cloned()
    }

    /// How many mutating calls have gone through the client interface.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl SecretClient for MockClient {
    fn get(&self, vault: &str, name: &str) -> Result<Item> {
        self.item(vault, name).ok_or_else(|| Error::ItemNotFound {
            vault: vault.to_string(),
            name: name.to_string(),
        })
    }

    fn create(&self, vault: &str, item: &Item) -> Result<()> {
        *self.writes.lock().unwrap() += 1;
        self.put(vault, item.clone());
        Ok(())
    }

    fn update(&self, item: &Item, remote: &Item) -> Result<()> {
        *self.writes.lock().unwrap() += 1;
        let mut stored = item.clone();
        stored.id = remote.id.clone();
        self.put(&item.vault.id, stored);
        Ok(())
    }

    fn list(&self, vault: &str, prefix: &str) -> Result<Vec<String>> {
        let items = self.items.lock().unwrap();
        let mut names: Vec<String> = items
            .keys()
            .filter(|(v, title)| v == vault && title.starts_with(prefix))
            .map(|(_, title)| title.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Keeps the mock installed as the global client; tests touching the global
/// are serialized through the guard so they cannot observe each other's
/// backends.
pub struct MockGuard {
    client: Arc<MockClient>,
    _serial: MutexGuard<'static, ()>,
}

impl Deref for MockGuard {
    type Target = MockClient;

    fn deref(&self) -> &MockClient {
        &self.client
    }
}

static INSTALL_LOCK: Lazy<Mutex<()>> = Lazy::new(Mutex::default);

/// Installs a fresh mock as the global client and returns a guard handle to
/// inspect it.
pub fn install() -> MockGuard {
    let serial = INSTALL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let client = Arc::new(MockClient::new());
    use_client(client.clone());
    MockGuard {
        client,
        _serial: serial,
    }
}
