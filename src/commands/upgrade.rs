use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat};
use colored::Colorize;
use serde::Serialize;

use crate::catalog::{self, Catalog};
use crate::commands::Environment;
use crate::config::{ConfigStore, ProjectState};
use crate::error::UpgradeError;
use crate::installer::{NodeInstaller, NpmRefresher, NvmActivator};
use crate::options::verbose;
use crate::orchestrator::Orchestrator;
use crate::plan::{InstallSource, PlanRequest, UpgradeResult};
use crate::prompt::{ConsolePrompter, Prompter};
use crate::selector::{Selection, SourceSelector};
use crate::state::{self, NvmProbe};
use crate::utils::command::{NvmShell, SystemRunner};
use crate::utils::download::{self, DistSite, HttpDownloader};
use crate::utils::extract::TarExtractor;
use crate::utils::mover::CommandMover;
use crate::utils::platform::InstallStrategy;
use crate::version::Version;

pub fn execute(project_dir: Option<PathBuf>) -> Result<()> {
    let environment = Environment::load()?;
    let project_dir = match project_dir {
        Some(dir) => dir,
        None => env::current_dir().context("Failed to determine the current directory")?,
    };

    println!("{}", "Node.js upgrade".bright_green().bold());
    verbose::info(&format!("Platform: {}", environment.platform));

    let runner = SystemRunner;
    let nvm = NvmShell::new(&runner, &environment.nvm_dir);
    match nvm.version() {
        Ok(version) => verbose::info(&format!("nvm {} found", version)),
        Err(err) => {
            verbose::error(&format!("nvm is required but could not be loaded: {}", err));
            return Ok(());
        }
    }

    let probe = NvmProbe::new(&nvm, &environment.nvm_dir);
    let current = state::current_version(&probe);
    match &current {
        Some(version) => println!("Current Node.js version: {}", version.to_string().cyan()),
        None => println!("{}", "No active Node.js version found.".yellow()),
    }

    let prompter = ConsolePrompter::open();
    let selector = SourceSelector::new(&prompter, environment.settings.network_share);

    let selection = match load_catalog(&environment, &nvm) {
        Some(catalog) => {
            let choice = selector.choose()?;
            selector.resolve(choice, current.as_ref(), &catalog)?
        }
        None => {
            println!("{}", "The release listing is unavailable; install from a local archive.".yellow());
            selector.local_archive()?
        }
    };

    let request = match selection {
        Selection::Request(request) => request,
        Selection::NoUpgradeAvailable => {
            println!("{}", "No newer even-major LTS release is available.".yellow());
            return Ok(());
        }
        Selection::Cancelled => {
            println!("Upgrade cancelled.");
            return Ok(());
        }
    };

    let summary = match target_summary(&request) {
        Ok(summary) => summary,
        Err(err) => {
            verbose::error(&err.to_string());
            return Ok(());
        }
    };
    let target = request.target().cloned();
    let source = request.source().clone();
    println!("Upgrade target: {}", summary.green());
    if !prompter.confirm("Proceed with the upgrade?")? {
        println!("Upgrade cancelled.");
        return Ok(());
    }

    let strategy = InstallStrategy::select(environment.platform, environment.settings.strategy);
    verbose::info(&format!("Install strategy: {:?}", strategy));

    let downloader = HttpDownloader::new(environment.dirs.downloads_dir())?;
    let extractor = TarExtractor::new(environment.dirs.staging_dir(), &runner);
    let mover = CommandMover::new(&runner, environment.settings.privileged_moves)
        .with_owner(env::var("USER").ok());
    let installer = NodeInstaller {
        strategy,
        nvm: &nvm,
        downloader: &downloader,
        extractor: &extractor,
        mover: &mover,
        nvm_dir: environment.nvm_dir.clone(),
        dist: DistSite::for_platform(&environment.settings.dist_mirror, environment.platform),
    };
    let activator = NvmActivator::new(&nvm);
    let store = ProjectState::new(
        project_dir.clone(),
        ConfigStore::new(environment.dirs.preferences_path()),
    );
    let refresher = NpmRefresher::new(&nvm, project_dir);

    let orchestrator = Orchestrator {
        probe: &probe,
        installer: &installer,
        activator: &activator,
        store: &store,
        refresher: &refresher,
        prompter: &prompter,
    };
    let outcome = orchestrator.execute(request);

    if let Some(report_file) = &environment.settings.report_file {
        let report = RunReport::new(target.as_ref(), &source, &outcome);
        if let Err(err) = report.write(report_file) {
            verbose::warn(&format!("Could not write the run report: {:#}", err));
        }
    }

    match outcome {
        Ok(UpgradeResult {
            activated: true,
            installed_version,
        }) => {
            let version = installed_version.map(|v| v.to_string()).unwrap_or_default();
            println!("{}", format!("Node.js {} is now the default.", version).bright_green());
        }
        Ok(UpgradeResult {
            activated: false,
            installed_version: Some(version),
        }) => print_manual_instructions(&version, false),
        Ok(UpgradeResult {
            activated: false,
            installed_version: None,
        }) => {}
        Err(err) => {
            verbose::error(&format!("Upgrade failed: {}", err));
            if let (Some(version), UpgradeError::InstallFailed(_)) = (&target, &err) {
                print_manual_instructions(version, true);
            }
        }
    }

    Ok(())
}

/// What the operator is asked to confirm. A local archive whose name carries
/// no version ends the run here.
fn target_summary(request: &PlanRequest) -> crate::error::Result<String> {
    let plan = request.clone().into_plan()?;
    Ok(format!("{} ({})", plan.target(), plan.source()))
}

/// The remote listing, or `None` when the run has to fall back to a local
/// archive.
fn load_catalog(environment: &Environment, nvm: &NvmShell<'_>) -> Option<Catalog> {
    let mirror = &environment.settings.dist_mirror;
    let connected = download::probe_connectivity(mirror, environment.settings.connectivity_timeout());
    if !connected {
        verbose::warn(&format!("No connectivity to {}", mirror));
    }
    usable_catalog(connected, || catalog::fetch(nvm))
}

/// Only fetches when connected; an unavailable or empty listing is `None`.
fn usable_catalog(
    connected: bool,
    fetch: impl FnOnce() -> crate::error::Result<Catalog>,
) -> Option<Catalog> {
    if !connected {
        return None;
    }

    match fetch() {
        Ok(catalog) if catalog.is_empty() => {
            verbose::warn("The remote listing contains no even-major LTS releases");
            None
        }
        Ok(catalog) => {
            verbose::info(&format!("{} even-major LTS releases available", catalog.len()));
            Some(catalog)
        }
        Err(err) => {
            verbose::warn(&err.to_string());
            None
        }
    }
}

fn recovery_commands(version: &Version, include_install: bool) -> Vec<String> {
    let mut commands = Vec::new();
    if include_install {
        commands.push(format!("nvm install {}", version));
    }
    commands.push(format!("nvm use {}", version));
    commands.push(format!("nvm alias default {}", version));
    commands
}

fn print_manual_instructions(version: &Version, include_install: bool) {
    println!(
        "{}",
        format!("Node.js {} could not be activated automatically.", version).yellow()
    );
    println!("Run the following in a new terminal:");
    for command in recovery_commands(version, include_install) {
        println!("  {}", command.bright_white());
    }
}

/// Summary written to `reportFile` after a run that reached the installer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    timestamp: String,
    target: Option<Version>,
    source: String,
    installed_version: Option<Version>,
    activated: bool,
}

impl RunReport {
    fn new(
        target: Option<&Version>,
        source: &InstallSource,
        outcome: &crate::error::Result<UpgradeResult>,
    ) -> Self {
        let (installed_version, activated) = match outcome {
            Ok(result) => (result.installed_version.clone(), result.activated),
            Err(_) => (None, false),
        };
        Self {
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            target: target.cloned(),
            source: source.to_string(),
            installed_version,
            activated,
        }
    }

    fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("failed to write report: {}", path.display()))?;
        verbose::info(&format!("Run report written to {}", path.display()));
        Ok(())
    }
}
