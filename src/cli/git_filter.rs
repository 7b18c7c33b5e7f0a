//! `joao git-filter {clean,diff}`
//!
//! Install as a clean filter (redacting secrets on check-in, optionally
//! flushing them first) and as a textconv driver so `git diff` compares
//! what would be committed:
//!
//! ```sh
//! git config filter.joao.clean "joao git-filter clean --flush %f"
//! git config filter.joao.smudge cat
//! git config diff.joao.textconv "joao git-filter diff"
//! echo '**/*.joao.yaml filter=joao diff=joao' >> .gitattributes
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use clap::Subcommand;

use crate::config::{self, Config, OutputOptions};
use crate::error::Result;
use crate::opclient;

#[derive(Subcommand)]
pub enum GitFilterCommand {
    /// Called by git when a file is checked in; prints it redacted
    Clean {
        /// Save to 1Password before redacting
        #[arg(long)]
        flush: bool,
        /// The staged path to read
        path: String,
    },
    /// Called by git to render a file for diffing; prints it redacted
    Diff {
        /// The staged path to read
        path: String,
    },
}

pub fn run(command: GitFilterCommand) -> Result<()> {
    match command {
        GitFilterCommand::Clean { flush, path } => emit_redacted(&path, flush),
        GitFilterCommand::Diff { path } => emit_redacted(&path, false),
    }
}

fn emit_redacted(path: &str, flush: bool) -> Result<()> {
    let contents = fs::read(path)?;
    let mut cfg = Config::from_yaml(&contents)?;

    if flush {
        let (vault, name) = config::vault_and_name_from(Path::new(path), Some(&contents))?;
        cfg.vault = vault;
        cfg.name = name;
        opclient::update(&cfg.vault, &cfg.name, &cfg.to_item())?;
    }

    std::io::stdout().write_all(cfg.as_yaml(OutputOptions::REDACTED).as_bytes())?;
    Ok(())
}
