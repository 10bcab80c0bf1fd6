use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::options::verbose;
use crate::utils::command::NvmShell;
use crate::version::Version;

/// Answers about the local installation, supplied by the version manager.
pub trait VersionProbe {
    fn version_dir_exists(&self, version: &Version) -> bool;
    fn listed_by_tool(&self, version: &Version) -> Result<bool>;
    fn active_version(&self) -> Result<Version>;
}

/// Installed if the version directory exists or nvm lists it. A failing
/// listing only means "not corroborated".
pub fn is_installed(version: &Version, probe: &dyn VersionProbe) -> bool {
    if probe.version_dir_exists(version) {
        verbose::info(&format!("{} is already present in the versions directory", version));
        return true;
    }

    match probe.listed_by_tool(version) {
        Ok(true) => {
            verbose::info(&format!("{} is installed according to nvm", version));
            true
        }
        Ok(false) => false,
        Err(err) => {
            verbose::debug(&format!("nvm listing for {} failed: {}", version, err));
            false
        }
    }
}

/// `None` when no runtime resolves; that is a valid starting point.
pub fn current_version(probe: &dyn VersionProbe) -> Option<Version> {
    match probe.active_version() {
        Ok(version) => Some(version),
        Err(err) => {
            verbose::warn(&format!("Could not determine the active Node.js version: {}", err));
            None
        }
    }
}

pub fn versions_dir(nvm_dir: &Path) -> PathBuf {
    nvm_dir.join("versions").join("node")
}

/// Versions found under nvm's directory, newest first.
pub fn installed_versions(nvm_dir: &Path) -> Result<Vec<Version>> {
    let dir = versions_dir(nvm_dir);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(Vec::new()),
    };

    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(version) = entry
            .file_name()
            .to_str()
            .and_then(|name| Version::parse(name).ok())
        {
            versions.push(version);
        }
    }

    versions.sort_by(|a, b| b.cmp(a));
    Ok(versions)
}

pub struct NvmProbe<'a> {
    nvm: &'a NvmShell<'a>,
    nvm_dir: PathBuf,
}

impl<'a> NvmProbe<'a> {
    pub fn new(nvm: &'a NvmShell<'a>, nvm_dir: &Path) -> Self {
        Self {
            nvm,
            nvm_dir: nvm_dir.to_path_buf(),
        }
    }
}

impl VersionProbe for NvmProbe<'_> {
    fn version_dir_exists(&self, version: &Version) -> bool {
        versions_dir(&self.nvm_dir)
            .join(version.to_string())
            .is_dir()
    }

    fn listed_by_tool(&self, version: &Version) -> Result<bool> {
        let rendered = version.to_string();
        let listing = self.nvm.nvm(&["ls", "--no-colors", &rendered])?;
        Ok(listing
            .split_whitespace()
            .any(|field| field == rendered))
    }

    /// The version a new shell resolves, not the one inherited through PATH.
    fn active_version(&self) -> Result<Version> {
        let output = self.nvm.exec_default(&["node", "--version"])?;
        Version::parse(&output)
    }
}
