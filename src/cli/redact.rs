//! `joao redact CONFIG…`

use std::path::Path;

use clap::Args;
use tracing::info;

use crate::config::{self, OutputOptions};
use crate::error::Result;

#[derive(Args)]
pub struct RedactArgs {
    /// The configuration file(s) to redact
    #[arg(required = true)]
    pub configs: Vec<String>,
}

pub fn run(args: RedactArgs) -> Result<()> {
    for path in &args.configs {
        let cfg = config::load(path, false)?;
        cfg.as_file(Path::new(path), OutputOptions::REDACTED)?;
        info!("redacted {}", path);
    }
    info!("done");
    Ok(())
}
