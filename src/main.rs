mod catalog;
mod commands;
mod config;
mod error;
mod installer;
mod options;
mod orchestrator;
mod plan;
mod prompt;
mod resolver;
mod selector;
mod state;
mod utils;
mod version;

use clap::Parser;
use colored::Colorize;

fn main() -> anyhow::Result<()> {
    let cli = options::Cli::parse();

    options::verbose::set_verbose(cli.verbose);

    if cli.verbose && cli.version {
        println!("Verbose mode: {}", "enabled".green());
        options::version::show();
        return Ok(());
    }

    if cli.version {
        options::version::show();
        return Ok(());
    }

    match cli.command {
        Some(options::Commands::Upgrade { project_dir }) => {
            commands::upgrade::execute(project_dir)?;
        }
        Some(options::Commands::List { remote }) => {
            commands::list::execute(remote)?;
        }
        None => {
            commands::upgrade::execute(None)?;
        }
    }

    Ok(())
}
