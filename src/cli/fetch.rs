//! `joao fetch CONFIG…`

use std::io::Write;
use std::path::Path;

use clap::Args;
use tracing::{info, warn};

use crate::config::{self, OutputOptions};
use crate::error::Result;

#[derive(Args)]
pub struct FetchArgs {
    /// The configuration file(s) to fetch
    #[arg(required = true)]
    pub configs: Vec<String>,

    /// Print the result instead of writing the file
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: FetchArgs) -> Result<()> {
    for path in &args.configs {
        let remote = config::load(path, true)?;
        let mut local = config::load(path, false)?;
        local.merge(&remote);

        if args.dry_run {
            warn!("dry-run: would write to {}", path);
            std::io::stdout().write_all(local.as_yaml(OutputOptions::default()).as_bytes())?;
        } else {
            local.as_file(Path::new(path), OutputOptions::default())?;
            info!("updated {}", path);
        }
    }
    info!("done");
    Ok(())
}
