//! `joao set CONFIG PATH`

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::info;

use super::split_query;
use crate::config::{self, OutputOptions};
use crate::error::{Error, Result};
use crate::opclient;

#[derive(Args)]
pub struct SetArgs {
    /// The configuration file to modify
    pub config: String,

    /// A dot-delimited path to set within the configuration
    pub path: String,

    /// The file to read the value from
    #[arg(short, long, default_value = "/dev/stdin")]
    pub input: PathBuf,

    /// Store the value as a secret
    #[arg(long)]
    pub secret: bool,

    /// Treat the input as JSON-encoded
    #[arg(long)]
    pub json: bool,

    /// Remove the value at PATH instead of setting it
    #[arg(long)]
    pub delete: bool,

    /// Save to 1Password after updating the file
    #[arg(long)]
    pub flush: bool,
}

pub fn run(args: SetArgs) -> Result<()> {
    if args.secret && args.delete {
        return Err(Error::InvalidArgs(
            "a deleted value cannot also be secret".to_string(),
        ));
    }
    if args.secret && args.json {
        return Err(Error::InvalidArgs(
            "a value cannot be both secret and parsed".to_string(),
        ));
    }

    let mut cfg = config::load(&args.config, false)?;
    let parts = split_query(&args.path);

    if args.delete {
        cfg.delete(&parts)?;
    } else {
        let bytes = fs::read(&args.input)?;
        cfg.set(&parts, &bytes, args.secret, args.json)?;
    }

    cfg.as_file(Path::new(&args.config), OutputOptions::default())?;

    if args.flush {
        opclient::update(&cfg.vault, &cfg.name, &cfg.to_item()).map_err(|err| {
            Error::Transport(format!("could not flush to 1password: {}", err))
        })?;
    }

    info!("done");
    Ok(())
}
