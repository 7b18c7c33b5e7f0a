//! `joao keys CONFIG`, the helper behind key-path shell completion.

use std::fs;
use std::path::PathBuf;

use clap::Args;

use crate::config::{keys_in, KeyListMode};
use crate::error::Result;

#[derive(Args)]
pub struct KeysArgs {
    /// The configuration file to list keys from
    pub config: PathBuf,

    /// Also list container paths
    #[arg(long)]
    pub parents: bool,
}

pub fn run(args: KeysArgs) -> Result<()> {
    let bytes = fs::read(&args.config)?;
    let mode = if args.parents {
        KeyListMode::WithParents
    } else {
        KeyListMode::Leaves
    };
    for key in keys_in(&bytes, mode)? {
        println!("{}", key);
    }
    Ok(())
}
