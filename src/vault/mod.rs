//! Adapter for the secrets-backend plugin host.
//!
//! A plugin host mounts two read paths over this service: `tree/[vault/]id`
//! returning a config as a nested JSON map, and `trees/[vault/]` listing
//! available configs. The host process itself (transport, authentication,
//! caching) is not part of this crate; its storage carries only the
//! [`PluginConfig`] needed to build a Connect-backed service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::opclient::{Connect, SecretClient};

/// Connection settings a plugin host persists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PluginConfig {
    pub host: String,
    pub token: String,
    #[serde(default)]
    pub vault: String,
}

/// Read-only view over configs in the secret manager.
pub struct TreeService {
    client: Arc<dyn SecretClient>,
    default_vault: Option<String>,
}

impl TreeService {
    pub fn new(client: Arc<dyn SecretClient>, default_vault: Option<String>) -> TreeService {
        TreeService {
            client,
            default_vault,
        }
    }

    /// Builds a Connect-backed service from plugin storage.
    pub fn from_config(config: &PluginConfig) -> Result<TreeService> {
        let client = Connect::new(&config.host, &config.token)?;
        let default_vault = Some(config.vault.clone()).filter(|v| !v.is_empty());
        Ok(TreeService::new(Arc::new(client), default_vault))
    }

    /// Reads `vault/id` (or `id` against the default vault) as a nested
    /// JSON map.
    pub fn read_tree(&self, path: &str) -> Result<JsonValue> {
        let (vault, id) = self.split(path)?;
        let item = self.client.get(&vault, &id)?;
        let cfg = Config::from_item(&item)?;
        Ok(cfg.to_map(false))
    }

    /// Lists config names, optionally in an explicit vault.
    pub fn list_trees(&self, vault: Option<&str>) -> Result<Vec<String>> {
        let vault = match vault {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => self.require_default_vault()?,
        };
        self.client.list(&vault, "")
    }

    fn split(&self, path: &str) -> Result<(String, String)> {
        match path.split_once('/') {
            Some((vault, id)) if !vault.is_empty() && !id.is_empty() => {
                Ok((vault.to_string(), id.to_string()))
            }
            Some(_) => Err(Error::InvalidArgs(format!("malformed tree path {:?}", path))),
            None => Ok((self.require_default_vault()?, path.to_string())),
        }
    }

    fn require_default_vault(&self) -> Result<String> {
        self.default_vault
            .clone()
            .ok_or_else(|| Error::ConfigMissing("no vault configured for the plugin".to_string()))
    }
}
