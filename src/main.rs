use clap::Parser;
use colored::Colorize;

use joao::cli::{self, Cli};

fn main() {
    let cli = Cli::parse();
    cli::init(&cli);

    if let Err(err) = cli::run(cli) {
        eprintln!("{} {}", "error:".red().bold(), err);
        std::process::exit(err.exit_code());
    }
}
