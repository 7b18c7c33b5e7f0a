//! Secret-manager backend over the 1Password Connect HTTP API.

use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use super::SecretClient;
use crate::config::item::Item;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("joao/", env!("CARGO_PKG_VERSION"));

/// Connect vault ids are 26 lowercase alphanumeric characters.
const VAULT_ID_LENGTH: usize = 26;

pub struct Connect {
    http: HttpClient,
    base: Url,
    token: String,
    /// Mutating calls log and succeed without touching the server.
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
struct VaultInfo {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "createdAt")]
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct ItemStub {
    id: String,
}

pub fn is_valid_vault_id(id: &str) -> bool {
    id.len() == VAULT_ID_LENGTH
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

impl Connect {
    pub fn new(host: &str, token: &str) -> Result<Connect> {
        let base = Url::parse(host)
            .map_err(|err| Error::Transport(format!("invalid connect host {:?}: {}", host, err)))?;
        let http = HttpClient::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Connect {
            http,
            base,
            token: token.to_string(),
            dry_run: false,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|err| Error::Transport(format!("invalid connect path {:?}: {}", path, err)))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        Ok(request.bearer_auth(&self.token).send()?)
    }

    fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(Error::Transport(format!(
            "connect returned {}: {}",
            status,
            body.trim_end()
        )))
    }

    /// Resolves a vault title to its id. Titles matching several vaults pick
    /// the oldest, mirroring the server-side tiebreak users expect.
    fn vault_id(&self, identifier: &str) -> Result<String> {
        if is_valid_vault_id(identifier) {
            return Ok(identifier.to_string());
        }

        let response = self.send(self.http.get(self.url("/v1/vaults")?))?;
        let vaults: Vec<VaultInfo> = self.check(response)?.json()?;
        let mut matching: Vec<VaultInfo> = vaults
            .into_iter()
            .filter(|v| v.name == identifier)
            .collect();

        if matching.is_empty() {
            return Err(Error::Transport(format!(
                "no vaults found with identifier {:?}",
                identifier
            )));
        }
        if matching.len() > 1 {
            // RFC 3339 timestamps sort lexicographically.
            matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            info!(
                "{} vaults found with the title {:?}, using the oldest ({})",
                matching.len(),
                identifier,
                matching[0].id
            );
        }
        Ok(matching.remove(0).id)
    }

    fn find_item_id(&self, vault_id: &str, name: &str) -> Result<String> {
        let url = self.url(&format!("/v1/vaults/{}/items", vault_id))?;
        let request = self
            .http
            .get(url)
            .query(&[("filter", format!("title eq \"{}\"", name))]);
        let response = self.send(request)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ItemNotFound {
                vault: vault_id.to_string(),
                name: name.to_string(),
            });
        }
        let stubs: Vec<ItemStub> = self.check(response)?.json()?;
        match stubs.into_iter().next() {
            Some(stub) => Ok(stub.id),
            None => Err(Error::ItemNotFound {
                vault: vault_id.to_string(),
                name: name.to_string(),
            }),
        }
    }
}

impl SecretClient for Connect {
    fn get(&self, vault: &str, name: &str) -> Result<Item> {
        let vault_id = self.vault_id(vault)?;
        let item_id = self.find_item_id(&vault_id, name)?;
        let url = self.url(&format!("/v1/vaults/{}/items/{}", vault_id, item_id))?;
        let response = self.send(self.http.get(url))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ItemNotFound {
                vault: vault_id,
                name: name.to_string(),
            });
        }
        Ok(self.check(response)?.json()?)
    }

    fn create(&self, vault: &str, item: &Item) -> Result<()> {
        let vault_id = self.vault_id(vault)?;
        let mut payload = item.clone();
        payload.vault.id = vault_id.clone();

        if self.dry_run {
            warn!("dry-run: would have created item {}/{}", vault, item.title);
            return Ok(());
        }
        info!("creating new item: {}/{}", vault, item.title);
        let url = self.url(&format!("/v1/vaults/{}/items", vault_id))?;
        let response = self.send(self.http.post(url).json(&payload))?;
        self.check(response)?;
        Ok(())
    }

    fn update(&self, item: &Item, remote: &Item) -> Result<()> {
        let vault_id = self.vault_id(&remote.vault.id)?;
        let mut payload = item.clone();
        payload.id = remote.id.clone();
        payload.vault.id = vault_id.clone();

        if self.dry_run {
            warn!(
                "dry-run: would have updated item {}/{}",
                payload.vault.id, payload.title
            );
            return Ok(());
        }
        let url = self.url(&format!("/v1/vaults/{}/items/{}", vault_id, remote.id))?;
        let response = self.send(self.http.put(url).json(&payload))?;
        self.check(response)?;
        info!("item {}/{} updated", payload.vault.id, payload.title);
        Ok(())
    }

    fn list(&self, vault: &str, prefix: &str) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Summary {
            title: String,
        }

        let vault_id = self.vault_id(vault)?;
        let url = self.url(&format!("/v1/vaults/{}/items", vault_id))?;
        let response = self.send(self.http.get(url))?;
        let summaries: Vec<Summary> = self.check(response)?.json()?;
        let mut names: Vec<String> = summaries
            .into_iter()
            .map(|s| s.title)
            .filter(|t| t.starts_with(prefix))
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_id_shape() {
        assert!(is_valid_vault_id("abcdefghij0123456789abcdef"));
        assert!(!is_valid_vault_id("too-short"));
        assert!(!is_valid_vault_id("ABCDEFGHIJ0123456789ABCDEF"));
    }

    #[test]
    fn rejects_bad_hosts() {
        assert!(Connect::new("not a url", "token").is_err());
        assert!(Connect::new("http://localhost:8080", "token").is_ok());
    }
}
