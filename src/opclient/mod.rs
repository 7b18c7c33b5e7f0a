//! Secret-manager clients.
//!
//! [`SecretClient`] is the narrow interface the core consumes; the two
//! backends talk to 1Password over the `op` CLI ([`OpCli`]) or the Connect
//! HTTP API ([`Connect`]). A process-global, replaceable client (defaulting
//! to the CLI backend) keeps command code independent of the transport in
//! use.

use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::{info, warn};

use crate::config::item::Item;
use crate::error::{Error, Result};

mod checksum;
pub mod cli;
pub mod connect;
pub mod mock;

pub use checksum::checksum;
pub use cli::OpCli;
pub use connect::Connect;

/// Operations every secret-manager backend provides. Backends are
/// responsible for classifying a missing item as [`Error::ItemNotFound`] so
/// callers can recover without string matching.
pub trait SecretClient: Send + Sync {
    fn get(&self, vault: &str, name: &str) -> Result<Item>;
    fn create(&self, vault: &str, item: &Item) -> Result<()>;
    fn update(&self, item: &Item, remote: &Item) -> Result<()>;
    fn list(&self, vault: &str, prefix: &str) -> Result<Vec<String>>;
}

static CLIENT: Lazy<RwLock<Arc<dyn SecretClient>>> =
    Lazy::new(|| RwLock::new(Arc::new(OpCli::default())));

/// Replaces the process-global client.
pub fn use_client(client: Arc<dyn SecretClient>) {
    let mut guard = CLIENT.write().unwrap_or_else(|e| e.into_inner());
    *guard = client;
}

/// The process-global client.
pub fn client() -> Arc<dyn SecretClient> {
    CLIENT.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Fetches an item through the global client.
pub fn get(vault: &str, name: &str) -> Result<Item> {
    client().get(vault, name)
}

/// Lists item names with the given prefix through the global client.
pub fn list(vault: &str, prefix: &str) -> Result<Vec<String>> {
    client().list(vault, prefix)
}

/// Creates or updates the remote copy of `item`. A missing remote becomes a
/// create; an unchanged one (stored checksum matching both the local item
/// and the freshly computed remote state) is left alone.
pub fn update(vault: &str, name: &str, item: &Item) -> Result<()> {
    let backend = client();
    let remote = match backend.get(vault, name) {
        Ok(remote) => remote,
        Err(Error::ItemNotFound { .. }) => return backend.create(vault, item),
        Err(err) => {
            return Err(Error::Transport(format!(
                "could not fetch remote item to compare against: {}",
                err
            )))
        }
    };

    let remote_checksum = checksum(&remote.fields);
    if remote_checksum == item.value_of("password") && remote_checksum == remote.value_of("password")
    {
        warn!("item {}/{} is already up to date", vault, item.title);
        return Ok(());
    }

    info!("item {}/{} already exists, updating", vault, item.title);
    backend.update(item, &remote)
}
