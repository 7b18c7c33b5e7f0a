//! `joao flush CONFIG…`

use std::path::Path;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use crate::config::{self, OutputOptions};
use crate::error::{Error, Result};
use crate::opclient::{self, OpCli};

#[derive(Args)]
pub struct FlushArgs {
    /// The configuration file(s) to flush
    #[arg(required = true)]
    pub configs: Vec<String>,

    /// Log what would change without touching 1Password
    #[arg(long)]
    pub dry_run: bool,

    /// Rewrite the file without secret values after flushing
    #[arg(long)]
    pub redact: bool,
}

pub fn run(args: FlushArgs) -> Result<()> {
    if args.dry_run {
        opclient::use_client(Arc::new(OpCli::new(true)));
    }

    for path in &args.configs {
        let cfg = config::load(path, false)?;
        opclient::update(&cfg.vault, &cfg.name, &cfg.to_item()).map_err(|err| {
            Error::Transport(format!("could not flush to 1password: {}", err))
        })?;

        if args.redact && !args.dry_run {
            cfg.as_file(Path::new(path), OutputOptions::REDACTED)?;
        }
    }
    info!("done");
    Ok(())
}
