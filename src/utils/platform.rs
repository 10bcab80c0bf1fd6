use std::fmt;
use std::fs;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Wsl,
    Unknown,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            match fs::read_to_string("/proc/version") {
                Ok(kernel) if is_wsl_kernel(&kernel) => Platform::Wsl,
                _ => Platform::Linux,
            }
        } else {
            Platform::Unknown
        }
    }

    /// OS segment of the official archive names (`node-v20.11.0-<os>-<arch>`).
    pub fn dist_os(self) -> &'static str {
        match self {
            Platform::MacOs => "darwin",
            Platform::Linux | Platform::Wsl | Platform::Unknown => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
            Platform::Wsl => "WSL",
            Platform::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

pub fn is_wsl_kernel(proc_version: &str) -> bool {
    proc_version.to_lowercase().contains("microsoft")
}

pub fn dist_arch() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "x64"
    } else if cfg!(target_arch = "aarch64") {
        "arm64"
    } else if cfg!(target_arch = "arm") {
        "armv7l"
    } else {
        "x64"
    }
}

/// How a remote release reaches the version directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStrategy {
    /// `nvm install <version>` downloads and installs.
    ToolManaged,
    /// Download the official archive, extract it and move it into nvm's
    /// version directory ourselves.
    ManualPlacement,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyPreference {
    #[default]
    Auto,
    Tool,
    Manual,
}

impl InstallStrategy {
    pub fn select(platform: Platform, preference: StrategyPreference) -> Self {
        match preference {
            StrategyPreference::Tool => InstallStrategy::ToolManaged,
            StrategyPreference::Manual => InstallStrategy::ManualPlacement,
            StrategyPreference::Auto if platform == Platform::Wsl => {
                InstallStrategy::ManualPlacement
            }
            StrategyPreference::Auto => InstallStrategy::ToolManaged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_wsl_kernels() {
        assert!(is_wsl_kernel(
            "Linux version 5.15.153.1-microsoft-standard-WSL2 (root@65c757a075e2)"
        ));
        assert!(is_wsl_kernel("Linux version 4.4.0-19041-Microsoft"));
        assert!(!is_wsl_kernel("Linux version 6.8.0-45-generic (buildd@lcy02-amd64-075)"));
    }

    #[test]
    fn auto_strategy_places_manually_only_on_wsl() {
        let auto = StrategyPreference::Auto;
        assert_eq!(InstallStrategy::select(Platform::Wsl, auto), InstallStrategy::ManualPlacement);
        assert_eq!(InstallStrategy::select(Platform::Linux, auto), InstallStrategy::ToolManaged);
        assert_eq!(InstallStrategy::select(Platform::MacOs, auto), InstallStrategy::ToolManaged);
    }

    #[test]
    fn explicit_preference_wins() {
        assert_eq!(
            InstallStrategy::select(Platform::Wsl, StrategyPreference::Tool),
            InstallStrategy::ToolManaged
        );
        assert_eq!(
            InstallStrategy::select(Platform::MacOs, StrategyPreference::Manual),
            InstallStrategy::ManualPlacement
        );
    }

    #[test]
    fn preference_reads_from_lowercase_json() {
        let parsed: StrategyPreference = serde_json::from_str("\"manual\"").unwrap();
        assert_eq!(parsed, StrategyPreference::Manual);
    }
}
