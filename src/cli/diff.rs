//! `joao diff CONFIG…`

use clap::Args;

use crate::config;
use crate::error::Result;

#[derive(Args)]
pub struct DiffArgs {
    /// The configuration file(s) to diff
    #[arg(required = true)]
    pub configs: Vec<String>,

    /// Do not print secret values
    #[arg(long)]
    pub redacted: bool,

    /// Preview what fetch would change instead of what flush would
    #[arg(long)]
    pub fetch: bool,
}

pub fn run(args: DiffArgs) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    for path in &args.configs {
        let local = config::load(path, false)?;
        local.diff_remote(path, args.redacted, args.fetch, &mut stdout, &mut stderr)?;
    }
    Ok(())
}
