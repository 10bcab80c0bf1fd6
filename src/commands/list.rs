use std::env;

use anyhow::Result;
use colored::Colorize;

use crate::catalog;
use crate::commands::Environment;
use crate::config::{self, ConfigStore};
use crate::options::verbose;
use crate::state::{self, NvmProbe};
use crate::utils::command::{NvmShell, SystemRunner};
use crate::version::Version;

const REMOTE_LIMIT: usize = 30;

pub fn execute(remote: bool) -> Result<()> {
    let environment = Environment::load()?;
    let runner = SystemRunner;
    let nvm = NvmShell::new(&runner, &environment.nvm_dir);
    let probe = NvmProbe::new(&nvm, &environment.nvm_dir);

    let installed = state::installed_versions(&environment.nvm_dir)?;
    let current = state::current_version(&probe);

    if remote {
        list_remote_versions(&nvm, &installed, current.as_ref())
    } else {
        list_local_versions(&environment, &installed, current.as_ref())
    }
}

fn list_local_versions(
    environment: &Environment,
    installed: &[Version],
    current: Option<&Version>,
) -> Result<()> {
    println!("Installed Node.js versions:");

    if installed.is_empty() {
        println!("  No versions installed");
        return Ok(());
    }

    let pinned = config::read_pin(&env::current_dir()?);
    for version in installed {
        let label = tags(version, current, pinned.as_ref(), false);
        if Some(version) == current {
            println!("* {}{}", version.to_string().green(), label);
        } else {
            println!("  {}{}", version, label);
        }
    }

    match ConfigStore::new(environment.dirs.preferences_path()).get() {
        Ok(preferences) => {
            if let Some(last) = preferences.last_used_version {
                println!(
                    "\nLast upgrade: {} ({:?})",
                    last.to_string().cyan(),
                    preferences.preferred_install_method
                );
            }
        }
        Err(err) => verbose::warn(&format!("Could not read preferences: {}", err)),
    }

    Ok(())
}

fn list_remote_versions(
    nvm: &NvmShell<'_>,
    installed: &[Version],
    current: Option<&Version>,
) -> Result<()> {
    println!("Fetching available Node.js versions...");

    let available = catalog::fetch(nvm)?;
    if available.is_empty() {
        println!("No available versions found");
        return Ok(());
    }

    println!("\nAvailable even-major LTS versions:");

    // newest first, like the local listing
    for (shown, version) in available.versions().iter().rev().enumerate() {
        if shown == REMOTE_LIMIT {
            println!("  ... and {} more", available.len() - REMOTE_LIMIT);
            break;
        }

        let is_installed = installed.contains(version);
        let label = tags(version, current, None, is_installed);
        if is_installed {
            println!("* {}{}", version.to_string().yellow(), label);
        } else {
            println!("  {}", version);
        }
    }

    Ok(())
}

fn tags(
    version: &Version,
    current: Option<&Version>,
    pinned: Option<&Version>,
    installed: bool,
) -> String {
    let mut tags = Vec::new();
    if installed {
        tags.push("installed");
    }
    if Some(version) == current {
        tags.push("current");
    }
    if Some(version) == pinned {
        tags.push("pinned");
    }

    if tags.is_empty() {
        String::new()
    } else {
        format!(" ({})", tags.join(", "))
    }
}
