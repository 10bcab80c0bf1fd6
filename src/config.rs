use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::UpgradeError;
use crate::orchestrator::StateStore;
use crate::plan::InstallSource;
use crate::utils::download::DEFAULT_MIRROR;
use crate::utils::platform::StrategyPreference;
use crate::version::Version;

pub const PIN_FILE: &str = ".nvmrc";

pub struct UpgraderDirs {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl UpgraderDirs {
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.cache_dir.join("downloads")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.cache_dir.join("node-temp")
    }
}

pub fn get_dirs() -> Result<UpgraderDirs> {
    let project_dirs = ProjectDirs::from("com", "node-upgrader", "node-upgrader")
        .context("Failed to determine project directories")?;

    let config_dir = project_dirs.config_dir().to_path_buf();
    let cache_dir = project_dirs.cache_dir().to_path_buf();

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&cache_dir)?;

    Ok(UpgraderDirs {
        config_dir,
        cache_dir,
    })
}

/// Tool settings read from `settings.json`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub nvm_dir: Option<PathBuf>,
    pub dist_mirror: String,
    /// Offers the network-share install source in the menu.
    pub network_share: bool,
    /// Writes a JSON summary here after each run.
    pub report_file: Option<PathBuf>,
    pub privileged_moves: bool,
    pub strategy: StrategyPreference,
    pub connectivity_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            nvm_dir: None,
            dist_mirror: DEFAULT_MIRROR.to_string(),
            network_share: false,
            report_file: None,
            privileged_moves: true,
            strategy: StrategyPreference::Auto,
            connectivity_timeout_secs: 3,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("invalid settings file: {}", path.display()))?;
        Ok(settings)
    }

    /// settings.json, then `$NVM_DIR`, then `~/.nvm`.
    pub fn resolve_nvm_dir(&self, env_nvm_dir: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = &self.nvm_dir {
            return Ok(dir.clone());
        }
        if let Some(dir) = env_nvm_dir.filter(|dir| !dir.as_os_str().is_empty()) {
            return Ok(dir);
        }
        let base = BaseDirs::new().context("Failed to determine the home directory")?;
        Ok(base.home_dir().join(".nvm"))
    }

    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMethod {
    #[default]
    Remote,
    Local,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub last_used_version: Option<Version>,
    pub preferred_install_method: InstallMethod,
}

/// `config.json`. Only written by the upgrade; no decision reads it back.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn get(&self) -> crate::error::Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|err| UpgradeError::Config(format!("{}: {}", self.path.display(), err)))
    }

    /// Replaces one top-level key, keeping everything else in the file.
    pub fn set(&self, key: &str, value: serde_json::Value) -> crate::error::Result<()> {
        let mut document = match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(
                &content,
            )
            .map_err(|err| UpgradeError::Config(format!("{}: {}", self.path.display(), err)))?,
            Err(_) => serde_json::Map::new(),
        };
        document.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&document)
            .map_err(|err| UpgradeError::Config(err.to_string()))?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

pub fn write_pin(project_dir: &Path, version: &Version) -> crate::error::Result<PathBuf> {
    let pin_path = project_dir.join(PIN_FILE);
    fs::write(&pin_path, version.to_string())?;
    Ok(pin_path)
}

pub fn read_pin(project_dir: &Path) -> Option<Version> {
    let content = fs::read_to_string(project_dir.join(PIN_FILE)).ok()?;
    Version::parse(&content).ok()
}

/// Pin file and preferences for one project.
pub struct ProjectState {
    project_dir: PathBuf,
    store: ConfigStore,
}

impl ProjectState {
    pub fn new(project_dir: PathBuf, store: ConfigStore) -> Self {
        Self { project_dir, store }
    }
}

impl StateStore for ProjectState {
    fn write_pin(&self, version: &Version) -> crate::error::Result<()> {
        let existed = self.project_dir.join(PIN_FILE).exists();
        let path = write_pin(&self.project_dir, version)?;
        crate::options::verbose::info(&format!(
            "{} {} with {}",
            path.display(),
            if existed { "updated" } else { "created" },
            version
        ));
        Ok(())
    }

    fn record_preferences(
        &self,
        version: &Version,
        source: &InstallSource,
    ) -> crate::error::Result<()> {
        self.store
            .set("lastUsedVersion", serde_json::Value::String(version.to_string()))?;
        let method = serde_json::to_value(source.install_method())
            .map_err(|err| UpgradeError::Config(err.to_string()))?;
        self.store.set("preferredInstallMethod", method)
    }
}
