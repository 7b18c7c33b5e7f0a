//! Loading configs and deriving their (vault, name) identity.
//!
//! Identity comes from the document's own `_config` entry (tagged `!!joao`)
//! or, for anything it leaves out, from the nearest `.joao.yaml` found by
//! walking parent directories. Names can be synthesized from a template over
//! the file's location.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::{Config, Entry};
use crate::error::{Error, Result};
use crate::opclient;

/// Per-repository configuration file looked up in parent directories.
pub const REPO_CONFIG_NAME: &str = ".joao.yaml";
/// Template used when a repo config does not provide one.
pub const DEFAULT_NAME_TEMPLATE: &str = "{{DirName}}:{{FileName}}";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoConfig {
    #[serde(default)]
    pub vault: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "nameTemplate")]
    pub name_template: Option<String>,
}

pub fn is_yaml_path(reference: &str) -> bool {
    reference.ends_with(".yaml") || reference.ends_with(".yml")
}

/// Loads a config. `reference` is a YAML file path or a remote identifier,
/// optionally `vault/name`. With `prefer_remote` the secret manager is the
/// source of truth; otherwise the file is.
pub fn load(reference: &str, prefer_remote: bool) -> Result<Config> {
    if prefer_remote {
        let (vault, name) = if is_yaml_path(reference) {
            vault_and_name_from(Path::new(reference), None)?
        } else {
            match reference.split_once('/') {
                Some((vault, name)) => (vault.to_string(), name.to_string()),
                None => (String::new(), reference.to_string()),
            }
        };
        let item = opclient::get(&vault, &name)?;
        return Config::from_item(&item);
    }

    if !is_yaml_path(reference) {
        return Err(Error::InvalidArgs(format!(
            "could not load {} from local as it is not a yaml path",
            reference
        )));
    }
    Config::from_file(Path::new(reference))
}

impl Config {
    /// Reads a file and resolves its identity.
    pub fn from_file(path: &Path) -> Result<Config> {
        let buf = fs::read(path).map_err(|err| {
            Error::Io(std::io::Error::new(
                err.kind(),
                format!("could not read file {}: {}", path.display(), err),
            ))
        })?;

        let (vault, name) = vault_and_name_from(path, Some(&buf))?;
        debug!("resolved {} as op://{}/{}", path.display(), vault, name);

        let mut cfg = Config::from_yaml(&buf)?;
        cfg.vault = vault;
        cfg.name = name;
        Ok(cfg)
    }
}

/// Derives (vault, name) for a config file: the embedded `_config` wins, the
/// nearest repo config fills anything missing, and names fall back to the
/// name template evaluated against the file's location.
pub fn vault_and_name_from(path: &Path, bytes: Option<&[u8]>) -> Result<(String, String)> {
    let owned;
    let buf = match bytes {
        Some(buf) => buf,
        None => {
            owned = fs::read(path).map_err(|err| {
                Error::Io(std::io::Error::new(
                    err.kind(),
                    format!("could not read file {}: {}", path.display(), err),
                ))
            })?;
            &owned
        }
    };

    let mut vault = None;
    let mut name = None;
    let mut template = None;
    if let Ok(cfg) = Config::from_yaml(buf) {
        if let Some(meta) = cfg.tree.child_named("_config") {
            if meta.is_meta_config() {
                vault = scalar_of(meta, "vault");
                name = scalar_of(meta, "name");
                template = scalar_of(meta, "nameTemplate");
            }
        }
    }

    if vault.is_none() || name.is_none() {
        if let Some((repo_path, repo)) = find_repo_config(path)? {
            debug!("found repo config at {}", repo_path.display());
            if vault.is_none() {
                vault = repo.vault.filter(|v| !v.is_empty());
            }
            if name.is_none() {
                name = repo.name.filter(|n| !n.is_empty());
            }
            if template.is_none() {
                template = repo.name_template.filter(|t| !t.is_empty());
            }
        }
    }

    if name.is_none() {
        let tpl = template.unwrap_or_else(|| DEFAULT_NAME_TEMPLATE.to_string());
        // Only synthesize when some identity source exists; a bare file with
        // neither `_config` nor a repo config is an error, not a guess.
        if vault.is_some() {
            name = Some(render_name_template(&tpl, path)?);
        }
    }

    match (vault, name) {
        (Some(vault), Some(name)) => Ok((vault, name)),
        _ => Err(Error::ConfigMissing(format!(
            "no vault and name for {}; add a _config entry or a {} file",
            path.display(),
            REPO_CONFIG_NAME
        ))),
    }
}

fn scalar_of(entry: &Entry, key: &str) -> Option<String> {
    entry
        .child_named(key)
        .filter(|e| e.is_scalar() && !e.value.is_empty())
        .map(|e| e.value.clone())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn find_repo_config(start: &Path) -> Result<Option<(PathBuf, RepoConfig)>> {
    let start = absolute(start)?;
    let mut dir = start.parent();
    while let Some(current) = dir {
        let candidate = current.join(REPO_CONFIG_NAME);
        if candidate.is_file() {
            let buf = fs::read(&candidate)?;
            let repo: RepoConfig = serde_yaml::from_slice(&buf)?;
            return Ok(Some((candidate, repo)));
        }
        dir = current.parent();
    }
    Ok(None)
}

/// Renders a name template. Exactly two functions exist: `DirName` (base
/// name of the file's directory) and `FileName` (file name up to its first
/// dot).
fn render_name_template(template: &str, path: &Path) -> Result<String> {
    let path = absolute(path)?;
    let dir_name = path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string();

    let mut out = String::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(Error::ConfigMissing(format!(
                "unterminated name template {:?}",
                template
            )));
        };
        match after[..end].trim() {
            "DirName" => out.push_str(&dir_name),
            "FileName" => out.push_str(&file_name),
            unknown => {
                return Err(Error::ConfigMissing(format!(
                    "unknown name template function {:?}",
                    unknown
                )))
            }
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn identity_from_embedded_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.yaml");
        fs::write(
            &path,
            "_config: !!joao\n  vault: infra\n  name: prod:service\nkey: 1\n",
        )
        .unwrap();

        let (vault, name) = vault_and_name_from(&path, None).unwrap();
        assert_eq!(vault, "infra");
        assert_eq!(name, "prod:service");
    }

    #[test]
    fn identity_from_repo_config_with_default_template() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("config");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join(REPO_CONFIG_NAME), "vault: infra\n").unwrap();

        let path = nested.join("api.joao.yaml");
        fs::write(&path, "key: 1\n").unwrap();

        let (vault, name) = vault_and_name_from(&path, None).unwrap();
        assert_eq!(vault, "infra");
        assert_eq!(name, "config:api");
    }

    #[test]
    fn repo_template_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(REPO_CONFIG_NAME),
            "vault: infra\nnameTemplate: \"svc-{{ FileName }}\"\n",
        )
        .unwrap();
        let path = dir.path().join("db.yaml");
        fs::write(&path, "key: 1\n").unwrap();

        let (_, name) = vault_and_name_from(&path, None).unwrap();
        assert_eq!(name, "svc-db");
    }

    #[test]
    fn embedded_config_wins_over_repo_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(REPO_CONFIG_NAME),
            "vault: repo-vault\n",
        )
        .unwrap();
        let path = dir.path().join("svc.yaml");
        fs::write(
            &path,
            "_config: !!joao\n  vault: file-vault\n  name: file-name\n",
        )
        .unwrap();

        let (vault, name) = vault_and_name_from(&path, None).unwrap();
        assert_eq!(vault, "file-vault");
        assert_eq!(name, "file-name");
    }

    #[test]
    fn missing_identity_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orphan.yaml");
        fs::write(&path, "key: 1\n").unwrap();

        let err = vault_and_name_from(&path, None).unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(_)));
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn unknown_template_function_fails() {
        let err = render_name_template("{{ Nope }}", Path::new("/tmp/x.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(_)));
    }

    #[test]
    fn yaml_path_detection() {
        assert!(is_yaml_path("config/test.yaml"));
        assert!(is_yaml_path("test.yml"));
        assert!(!is_yaml_path("vault/item-name"));
    }
}
