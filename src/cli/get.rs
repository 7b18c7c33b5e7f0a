//! `joao get CONFIG [PATH]`

use std::io::Write;

use clap::{Args, ValueEnum};

use super::split_query;
use crate::config::{self, OutputOptions};
use crate::error::Result;
use crate::yaml;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The document (or value) as stored
    Raw,
    /// Plain JSON, typed per the value annotations
    Json,
    /// YAML with the source comments and ordering
    Yaml,
    /// Canonical YAML: sorted keys, no comments
    #[value(name = "diff-yaml")]
    DiffYaml,
    /// The flat 1Password item as JSON
    Op,
}

#[derive(Args)]
pub struct GetArgs {
    /// The configuration file (or item name) to read
    pub config: String,

    /// A dot-delimited path to read within the configuration
    pub path: Option<String>,

    /// The format to output in
    #[arg(short, long, value_enum, default_value = "raw")]
    pub output: OutputFormat,

    /// Query 1Password instead of the filesystem
    #[arg(long)]
    pub remote: bool,

    /// Do not print secret values
    #[arg(long)]
    pub redacted: bool,
}

pub fn run(args: GetArgs) -> Result<()> {
    let cfg = config::load(&args.config, args.remote)?;
    let query = args.path.as_deref().unwrap_or(".");
    let parts = split_query(query);
    let entry = cfg.lookup(&parts)?;
    let at_root = std::ptr::eq(entry, &cfg.tree);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Op => {
            writeln!(out, "{}", cfg.as_json(args.redacted, true)?)?;
        }
        OutputFormat::Json => {
            let value = if at_root {
                cfg.to_map(args.redacted)
            } else {
                entry.as_map(args.redacted)
            };
            writeln!(out, "{}", serde_json::to_string(&value)?)?;
        }
        OutputFormat::Raw if entry.is_scalar() => {
            let value = if args.redacted && entry.is_secret() {
                ""
            } else {
                entry.value.as_str()
            };
            writeln!(out, "{}", value)?;
        }
        OutputFormat::Raw | OutputFormat::Yaml | OutputFormat::DiffYaml => {
            let mut opts = if args.output == OutputFormat::DiffYaml {
                OutputOptions::NO_COMMENTS | OutputOptions::SORTED
            } else {
                OutputOptions::default()
            };
            if args.redacted {
                opts |= OutputOptions::REDACTED;
            }
            write!(out, "{}", yaml::emit(entry, opts))?;
        }
    }
    Ok(())
}
