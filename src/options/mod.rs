pub mod verbose;
pub mod version;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Upgrade the local Node.js runtime through nvm, one even-major LTS line at a time.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short = 'V', long, action = ArgAction::SetTrue)]
    pub version: bool,

    #[arg(short, long, action = ArgAction::SetTrue, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the interactive upgrade (default when no command is given)
    Upgrade {
        /// Project that receives the .nvmrc pin and the optional `npm update`
        #[arg(short, long)]
        project_dir: Option<PathBuf>,
    },

    /// List installed runtimes, or the remote even-major LTS releases
    List {
        #[arg(short, long)]
        remote: bool,
    },
}
