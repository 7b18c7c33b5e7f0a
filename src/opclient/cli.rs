//! Secret-manager backend driving the `op` CLI as a subprocess.

use std::io::Write;
use std::process::{Command, Stdio};

use once_cell::sync::OnceCell;
use semver::Version;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::SecretClient;
use crate::config::item::{FieldKind, Item, ItemField};
use crate::error::{Error, Result};

/// `op` versions from here on accept a whole item as JSON on stdin when
/// editing; older ones get one field assignment per argument.
const STRUCTURED_EDIT_VERSION: Version = Version::new(2, 23, 0);

/// Stderr fragments `op` prints for a missing item.
const MISSING_ITEM: &str = " isn't an item.";
const MISSING_ITEM_IN_VAULT: &str = " isn't an item in the ";

pub struct OpCli {
    /// Mutating calls log and succeed without touching 1Password.
    pub dry_run: bool,
    version: OnceCell<Version>,
}

impl Default for OpCli {
    fn default() -> Self {
        OpCli {
            dry_run: false,
            version: OnceCell::new(),
        }
    }
}

impl OpCli {
    pub fn new(dry_run: bool) -> OpCli {
        OpCli {
            dry_run,
            ..OpCli::default()
        }
    }

    fn invoke(&self, vault: &str, args: &[String], stdin: Option<&[u8]>) -> Result<Vec<u8>> {
        let mut full_args: Vec<String> = Vec::new();
        if !vault.is_empty() {
            full_args.push("--vault".into());
            full_args.push(vault.into());
        }
        full_args.extend(args.iter().cloned());
        debug!("invoking op with args: {}", render_args(&full_args));

        let mut cmd = Command::new("op");
        cmd.args(&full_args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                Error::Transport(
                    "1Password CLI (op) is not installed or not in PATH".to_string(),
                )
            } else {
                Error::Io(err)
            }
        })?;

        if let Some(bytes) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(bytes)?;
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(Error::Transport(format!(
                "op exited with {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim_end()
            )));
        }
        Ok(output.stdout)
    }

    fn op_version(&self) -> Result<&Version> {
        self.version.get_or_try_init(|| {
            let stdout = self.invoke("", &["--version".to_string()], None)?;
            parse_op_version(String::from_utf8_lossy(&stdout).trim())
        })
    }

    fn update_structured(&self, item: &Item) -> Result<()> {
        let payload = serde_json::to_vec(item)?;
        if self.dry_run {
            warn!(
                "dry-run: would have edited item {}/{} over stdin",
                item.vault.id, item.title
            );
            return Ok(());
        }
        self.invoke(
            &item.vault.id,
            &[
                "item".to_string(),
                "edit".to_string(),
                item.title.clone(),
                "--format".to_string(),
                "json".to_string(),
            ],
            Some(&payload),
        )?;
        info!("item {}/{} updated", item.vault.id, item.title);
        Ok(())
    }

    fn update_legacy(&self, item: &Item, remote: &Item) -> Result<()> {
        let mut args = vec![
            "item".to_string(),
            "edit".to_string(),
            item.title.clone(),
            "--".to_string(),
        ];

        let mut local_keys: Vec<String> = Vec::new();
        for field in &item.fields {
            let kind = match field.kind {
                FieldKind::Concealed => "password",
                FieldKind::String => "text",
            };
            let key = key_for_field(field);
            args.push(format!("{}[{}]={}", key, kind, field.value));
            local_keys.push(key);
        }

        for field in &remote.fields {
            let key = key_for_field(field);
            if !local_keys.contains(&key) {
                debug!("deleting remote key {}", key);
                args.push(format!("{}[delete]=", key));
            }
        }

        if self.dry_run {
            warn!("dry-run: would have invoked op {}", render_args(&args));
            return Ok(());
        }
        self.invoke(&item.vault.id, &args, None)?;
        info!("item {}/{} updated", item.vault.id, item.title);
        Ok(())
    }
}

impl SecretClient for OpCli {
    fn get(&self, vault: &str, name: &str) -> Result<Item> {
        let args = vec![
            "item".to_string(),
            "--format".to_string(),
            "json".to_string(),
            "get".to_string(),
            name.to_string(),
        ];
        let stdout = match self.invoke(vault, &args, None) {
            Ok(stdout) => stdout,
            Err(Error::Transport(msg))
                if msg.contains(MISSING_ITEM) || msg.contains(MISSING_ITEM_IN_VAULT) =>
            {
                return Err(Error::ItemNotFound {
                    vault: vault.to_string(),
                    name: name.to_string(),
                })
            }
            Err(err) => return Err(err),
        };
        Ok(serde_json::from_slice(&stdout)?)
    }

    fn create(&self, vault: &str, item: &Item) -> Result<()> {
        let payload = serde_json::to_vec(item)?;
        if self.dry_run {
            warn!("dry-run: would have created item {}/{}", vault, item.title);
            return Ok(());
        }
        info!("creating new item: {}/{}", vault, item.title);
        self.invoke(
            vault,
            &["item".to_string(), "create".to_string()],
            Some(&payload),
        )?;
        info!("item {}/{} created", vault, item.title);
        Ok(())
    }

    fn update(&self, item: &Item, remote: &Item) -> Result<()> {
        if *self.op_version()? >= STRUCTURED_EDIT_VERSION {
            self.update_structured(item)
        } else {
            self.update_legacy(item, remote)
        }
    }

    fn list(&self, vault: &str, prefix: &str) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Summary {
            title: String,
        }

        let stdout = self.invoke(
            vault,
            &[
                "item".to_string(),
                "list".to_string(),
                "--format".to_string(),
                "json".to_string(),
            ],
            None,
        )?;
        let summaries: Vec<Summary> = serde_json::from_slice(&stdout)?;
        let mut names: Vec<String> = summaries
            .into_iter()
            .map(|s| s.title)
            .filter(|t| t.starts_with(prefix))
            .collect();
        names.sort();
        Ok(names)
    }
}

/// `section.label` with literal dots in the label escaped, as the legacy
/// field-assignment syntax requires.
fn key_for_field(field: &ItemField) -> String {
    let mut name = field.label.replace('.', "\\.");
    if let Some(section) = &field.section {
        if !section.id.is_empty() {
            name = format!("{}.{}", section.id, name);
        }
    }
    name
}

/// Argument list for debug logging, with password assignments masked.
fn render_args(args: &[String]) -> String {
    args.iter()
        .map(|arg| match arg.split_once("[password]=") {
            Some((key, _)) => format!("{}[password]=*****", key),
            None => arg.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_op_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim().trim_start_matches('v');
    let padded = match trimmed.matches('.').count() {
        1 => format!("{}.0", trimmed),
        _ => trimmed.to_string(),
    };
    Version::parse(&padded)
        .map_err(|err| Error::Transport(format!("could not parse op version {:?}: {}", raw, err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::item::ItemSection;

    #[test]
    fn parses_versions_with_and_without_patch() {
        assert_eq!(parse_op_version("2.24.0").unwrap(), Version::new(2, 24, 0));
        assert_eq!(parse_op_version("2.23").unwrap(), Version::new(2, 23, 0));
        assert!(parse_op_version("2.23.0").unwrap() >= STRUCTURED_EDIT_VERSION);
        assert!(parse_op_version("2.22.9").unwrap() < STRUCTURED_EDIT_VERSION);
        assert!(parse_op_version("not-a-version").is_err());
    }

    #[test]
    fn field_keys_escape_dots_and_prefix_sections() {
        let field = ItemField {
            id: "nested.list.0".into(),
            section: Some(ItemSection::named("nested")),
            label: "list.0".into(),
            ..ItemField::default()
        };
        assert_eq!(key_for_field(&field), "nested.list\\.0");

        let bare = ItemField {
            id: "int".into(),
            label: "int".into(),
            ..ItemField::default()
        };
        assert_eq!(key_for_field(&bare), "int");
    }

    #[test]
    fn password_assignments_are_masked_in_logs() {
        let args = vec![
            "item".to_string(),
            "secret[password]=hunter2".to_string(),
            "plain[text]=ok".to_string(),
        ];
        let rendered = render_args(&args);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("secret[password]=*****"));
        assert!(rendered.contains("plain[text]=ok"));
    }
}
