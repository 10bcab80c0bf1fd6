use std::fmt;
use std::path::PathBuf;

use crate::config::InstallMethod;
use crate::error::{Result, UpgradeError};
use crate::version::Version;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    Remote,
    LocalArchive { path: PathBuf },
    NetworkShare { url: String },
}

impl InstallSource {
    pub fn install_method(&self) -> InstallMethod {
        match self {
            InstallSource::Remote | InstallSource::NetworkShare { .. } => InstallMethod::Remote,
            InstallSource::LocalArchive { .. } => InstallMethod::Local,
        }
    }
}

impl fmt::Display for InstallSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallSource::Remote => write!(f, "official releases"),
            InstallSource::LocalArchive { path } => write!(f, "local archive {}", path.display()),
            InstallSource::NetworkShare { url } => write!(f, "network share {}", url),
        }
    }
}

/// What the operator picked, before the target has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    target: Option<Version>,
    source: InstallSource,
}

impl PlanRequest {
    pub fn new(target: Version, source: InstallSource) -> Self {
        Self {
            target: Some(target),
            source,
        }
    }

    /// Target comes from the archive's file name and may be absent.
    pub fn from_local_archive(path: PathBuf) -> Self {
        let target = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(Version::extract_from_filename);
        Self {
            target,
            source: InstallSource::LocalArchive { path },
        }
    }

    pub fn target(&self) -> Option<&Version> {
        self.target.as_ref()
    }

    pub fn source(&self) -> &InstallSource {
        &self.source
    }

    pub fn into_plan(self) -> Result<InstallPlan> {
        match self.target {
            Some(target) => Ok(InstallPlan {
                target,
                source: self.source,
            }),
            None => Err(UpgradeError::MissingTargetVersion(self.source.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    target: Version,
    source: InstallSource,
}

impl InstallPlan {
    pub fn target(&self) -> &Version {
        &self.target
    }

    pub fn source(&self) -> &InstallSource {
        &self.source
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeResult {
    pub installed_version: Option<Version>,
    pub activated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_archive_target_comes_from_basename() {
        let request =
            PlanRequest::from_local_archive(PathBuf::from("/mnt/v1.2.3/node-v19.2.0-linux-x64.tar.gz"));
        assert_eq!(request.target(), Some(&Version::new(19, 2, 0)));
    }

    #[test]
    fn unnamed_archive_cannot_become_a_plan() {
        let request = PlanRequest::from_local_archive(PathBuf::from("/tmp/node-latest.tar.xz"));
        assert_eq!(request.target(), None);
        assert!(matches!(
            request.into_plan(),
            Err(UpgradeError::MissingTargetVersion(_))
        ));
    }

    #[test]
    fn network_share_counts_as_remote_install() {
        let share = InstallSource::NetworkShare {
            url: "https://share.local/node.tar.xz".into(),
        };
        assert_eq!(share.install_method(), InstallMethod::Remote);
        assert_eq!(InstallSource::Remote.install_method(), InstallMethod::Remote);
    }
}
