//! Command-line interface: argument parsing and dispatch.

use clap::{Parser, Subcommand};

use crate::Result;

mod completions;
mod diff;
mod fetch;
mod flush;
mod get;
mod git_filter;
mod keys;
mod redact;
mod set;

#[derive(Parser)]
#[command(name = "joao")]
#[command(about = "Keeps YAML configuration files and 1Password items in sync", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a configuration, or a value within one
    Get(get::GetArgs),
    /// Update a value in a configuration file
    Set(set::SetArgs),
    /// Show differences between local and remote configs
    Diff(diff::DiffArgs),
    /// Pull remote values into local configuration files
    Fetch(fetch::FetchArgs),
    /// Push local configuration files to 1Password
    Flush(flush::FlushArgs),
    /// Rewrite configuration files without secret values
    Redact(redact::RedactArgs),
    /// Filters for git clean/textconv integration
    #[command(subcommand, name = "git-filter")]
    GitFilter(git_filter::GitFilterCommand),
    /// List key paths in a configuration file
    #[command(hide = true)]
    Keys(keys::KeysArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Sets up logging and color handling from the global flags.
pub fn init(cli: &Cli) {
    if cli.no_color {
        colored::control::set_override(false);
    }
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Get(args) => get::run(args),
        Commands::Set(args) => set::run(args),
        Commands::Diff(args) => diff::run(args),
        Commands::Fetch(args) => fetch::run(args),
        Commands::Flush(args) => flush::run(args),
        Commands::Redact(args) => redact::run(args),
        Commands::GitFilter(command) => git_filter::run(command),
        Commands::Keys(args) => keys::run(args),
        Commands::Completions(args) => completions::run(args),
    }
}

/// Splits a dot-delimited query; `.` alone addresses the document root.
pub(crate) fn split_query(query: &str) -> Vec<String> {
    if query == "." {
        return vec![".".to_string()];
    }
    query.split('.').map(str::to_string).collect()
}
