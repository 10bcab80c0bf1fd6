use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::catalog::Catalog;
use crate::error::{FileProblem, Result, UpgradeError};
use crate::options::verbose;
use crate::plan::{InstallSource, PlanRequest};
use crate::prompt::Prompter;
use crate::resolver;
use crate::version::Version;

pub const ACCEPTED_ARCHIVE_EXTENSIONS: [&str; 3] = [".tar.xz", ".tar.gz", ".pkg"];
pub const CANCEL_SENTINEL: &str = "cancel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    InstallLatestEvenLts,
    InstallSpecificRemote,
    InstallFromLocalArchive,
    InstallFromNetworkShare,
    ListAllThenChooseSpecific,
}

impl MenuChoice {
    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::InstallLatestEvenLts => "Install the next even-major LTS release",
            MenuChoice::InstallSpecificRemote => "Install a specific version from the official releases",
            MenuChoice::InstallFromLocalArchive => "Install from a local archive",
            MenuChoice::InstallFromNetworkShare => "Install from a network share",
            MenuChoice::ListAllThenChooseSpecific => "List all available versions",
        }
    }

    /// Menu entries in display order; the network share entry only exists
    /// when it is enabled in the settings.
    pub fn menu(network_share: bool) -> Vec<MenuChoice> {
        let mut menu = vec![
            MenuChoice::InstallLatestEvenLts,
            MenuChoice::InstallSpecificRemote,
            MenuChoice::InstallFromLocalArchive,
        ];
        if network_share {
            menu.push(MenuChoice::InstallFromNetworkShare);
        }
        menu.push(MenuChoice::ListAllThenChooseSpecific);
        menu
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Request(PlanRequest),
    NoUpgradeAvailable,
    Cancelled,
}

pub struct SourceSelector<'a> {
    prompter: &'a dyn Prompter,
    network_share: bool,
}

impl<'a> SourceSelector<'a> {
    pub fn new(prompter: &'a dyn Prompter, network_share: bool) -> Self {
        Self {
            prompter,
            network_share,
        }
    }

    pub fn choose(&self) -> Result<MenuChoice> {
        let menu = MenuChoice::menu(self.network_share);
        let labels: Vec<String> = menu.iter().map(|choice| choice.label().to_string()).collect();

        loop {
            let index = self.prompter.choose_from_menu("Select an option:", &labels)?;
            if let Some(choice) = menu.get(index) {
                return Ok(*choice);
            }
        }
    }

    pub fn resolve(
        &self,
        choice: MenuChoice,
        current: Option<&Version>,
        catalog: &Catalog,
    ) -> Result<Selection> {
        verbose::debug(&format!("Menu choice: {:?}", choice));

        match choice {
            MenuChoice::InstallLatestEvenLts => {
                let target = match current {
                    Some(current) => resolver::next_even_major(current, catalog),
                    None => catalog.newest().cloned(),
                };
                Ok(match target {
                    Some(target) => {
                        Selection::Request(PlanRequest::new(target, InstallSource::Remote))
                    }
                    None => Selection::NoUpgradeAvailable,
                })
            }
            MenuChoice::InstallSpecificRemote => {
                let target = self.ask_version()?;
                Ok(Selection::Request(PlanRequest::new(target, InstallSource::Remote)))
            }
            MenuChoice::InstallFromLocalArchive => self.local_archive(),
            MenuChoice::InstallFromNetworkShare => {
                let target = self.ask_version()?;
                let url = self.ask_share_url()?;
                Ok(Selection::Request(PlanRequest::new(
                    target,
                    InstallSource::NetworkShare { url },
                )))
            }
            MenuChoice::ListAllThenChooseSpecific => {
                println!("{}", "Available even-major LTS versions:".cyan());
                for version in catalog {
                    println!("{}", version.to_string().yellow());
                }
                let target = self.ask_version()?;
                Ok(Selection::Request(PlanRequest::new(target, InstallSource::Remote)))
            }
        }
    }

    /// The local-archive flow on its own; also the fallback when the remote
    /// listing is out of reach.
    pub fn local_archive(&self) -> Result<Selection> {
        Ok(match self.ask_local_archive()? {
            Some(path) => Selection::Request(PlanRequest::from_local_archive(path)),
            None => {
                verbose::info("File selection cancelled by the operator");
                Selection::Cancelled
            }
        })
    }

    pub fn ask_version(&self) -> Result<Version> {
        loop {
            let answer = self
                .prompter
                .ask("Node.js version to install (format vX.Y.Z)")?;
            match Version::parse(&answer) {
                Ok(version) => return Ok(version),
                Err(err) => {
                    println!("{}", err.to_string().red());
                    println!("Use vX.Y.Z or X.Y.Z, for example v20.11.0 or 20.11.0");
                }
            }
        }
    }

    pub fn ask_local_archive(&self) -> Result<Option<PathBuf>> {
        loop {
            let answer = self.prompter.ask(&format!(
                "Full path of the Node.js archive (or \"{}\" to go back)",
                CANCEL_SENTINEL
            ))?;
            if answer.trim().eq_ignore_ascii_case(CANCEL_SENTINEL) {
                return Ok(None);
            }

            let path = PathBuf::from(clean_path(&answer));
            verbose::info(&format!("Validating local file {}", path.display()));
            match validate_local_archive(&path) {
                Ok(()) => return Ok(Some(path)),
                Err(err) => {
                    verbose::error(&err.to_string());
                    println!("{}", "Please try again with a valid path.".red());
                    println!(
                        "On WSL, Windows files live under /mnt/c, e.g. /mnt/c/Users/<user>/Downloads/node-<version>-linux-x64.tar.xz"
                    );
                }
            }
        }
    }

    pub fn ask_share_url(&self) -> Result<String> {
        loop {
            let answer = self.prompter.ask("URL of the archive on the network share")?;
            let url = answer.trim();
            if !url.is_empty() {
                return Ok(url.to_string());
            }
        }
    }
}

/// Strips surrounding whitespace and quotes, as pasted from a file manager.
pub fn clean_path(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\'' || c == '"')
}

/// Exists, is a regular file, has an accepted extension; checked in that order.
pub fn validate_local_archive(path: &Path) -> Result<()> {
    let reject = |problem| UpgradeError::FileValidation {
        path: path.to_path_buf(),
        problem,
    };

    let metadata = fs::metadata(path).map_err(|_| reject(FileProblem::Missing))?;
    if !metadata.is_file() {
        return Err(reject(FileProblem::NotAFile));
    }

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !ACCEPTED_ARCHIVE_EXTENSIONS
        .iter()
        .any(|extension| name.ends_with(extension))
    {
        return Err(reject(FileProblem::UnsupportedExtension));
    }

    Ok(())
}
