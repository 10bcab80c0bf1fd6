pub mod list;
pub mod upgrade;

use std::env;
use std::path::PathBuf;

use anyhow::Result;

use crate::config::{self, Settings, UpgraderDirs};
use crate::options::verbose;
use crate::utils::platform::Platform;

/// Everything a command needs to know about the machine before it starts.
pub struct Environment {
    pub dirs: UpgraderDirs,
    pub settings: Settings,
    pub nvm_dir: PathBuf,
    pub platform: Platform,
}

impl Environment {
    pub fn load() -> Result<Self> {
        let dirs = config::get_dirs()?;
        let settings = Settings::load(&dirs.settings_path())?;
        let nvm_dir = settings.resolve_nvm_dir(env::var_os("NVM_DIR").map(PathBuf::from))?;
        let platform = Platform::detect();

        verbose::debug(&format!("Settings: {}", dirs.settings_path().display()));
        verbose::debug(&format!("nvm directory: {}", nvm_dir.display()));

        Ok(Self {
            dirs,
            settings,
            nvm_dir,
            platform,
        })
    }
}
