use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, UpgradeError};
use crate::options::verbose;
use crate::orchestrator::{Activator, DependencyRefresher, Installer, Material};
use crate::plan::{InstallPlan, InstallSource};
use crate::state;
use crate::utils::command::NvmShell;
use crate::utils::download::{DistSite, Downloader};
use crate::utils::extract::ArchiveExtractor;
use crate::utils::mover::PrivilegedMover;
use crate::utils::platform::InstallStrategy;
use crate::version::Version;

/// Installs into nvm's version directory, either through `nvm install` or by
/// placing an extracted release archive there directly.
pub struct NodeInstaller<'a> {
    pub strategy: InstallStrategy,
    pub nvm: &'a NvmShell<'a>,
    pub downloader: &'a dyn Downloader,
    pub extractor: &'a dyn ArchiveExtractor,
    pub mover: &'a dyn PrivilegedMover,
    pub nvm_dir: PathBuf,
    pub dist: DistSite,
}

impl Installer for NodeInstaller<'_> {
    fn acquire(&self, plan: &InstallPlan) -> Result<Material> {
        match (plan.source(), self.strategy) {
            (InstallSource::Remote, InstallStrategy::ToolManaged) => Ok(Material::Managed),
            (InstallSource::Remote, InstallStrategy::ManualPlacement) => {
                let url = self.dist.archive_url(plan.target());
                Ok(Material::Archive {
                    path: self.downloader.fetch(&url)?,
                    temporary: true,
                })
            }
            (InstallSource::LocalArchive { path }, _) => Ok(Material::Archive {
                path: path.clone(),
                temporary: false,
            }),
            (InstallSource::NetworkShare { url }, _) => Ok(Material::Archive {
                path: self.downloader.fetch(url)?,
                temporary: true,
            }),
        }
    }

    fn install(&self, version: &Version, material: &Material) -> Result<()> {
        match material {
            Material::Managed => {
                let rendered = version.to_string();
                self.nvm
                    .nvm(&["install", &rendered])
                    .map_err(|err| UpgradeError::InstallFailed(err.to_string()))?;
                Ok(())
            }
            Material::Archive { path, temporary } => {
                self.place_archive(version, path)?;
                if *temporary {
                    discard_download(path);
                }
                Ok(())
            }
        }
    }
}

impl NodeInstaller<'_> {
    fn place_archive(&self, version: &Version, archive: &Path) -> Result<()> {
        let staged = self
            .extractor
            .extract(archive)
            .map_err(|err| UpgradeError::InstallFailed(format!("extraction failed: {}", err)))?;

        let dest = state::versions_dir(&self.nvm_dir).join(version.to_string());
        self.mover
            .move_dir(&staged, &dest)
            .map_err(|err| UpgradeError::InstallFailed(format!("could not place files: {}", err)))?;

        verbose::info(&format!("{} placed in {}", version, dest.display()));
        Ok(())
    }
}

fn discard_download(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => verbose::debug(&format!("Removed {}", path.display())),
        Err(err) => verbose::warn(&format!("Could not remove {}: {}", path.display(), err)),
    }
}

/// Makes a version the default for new shells.
pub struct NvmActivator<'a> {
    nvm: &'a NvmShell<'a>,
}

impl<'a> NvmActivator<'a> {
    pub fn new(nvm: &'a NvmShell<'a>) -> Self {
        Self { nvm }
    }
}

impl Activator for NvmActivator<'_> {
    fn activate(&self, version: &Version) -> Result<()> {
        let rendered = version.to_string();
        self.nvm.nvm(&["alias", "default", &rendered])?;
        Ok(())
    }
}

/// `npm update` in the project, using the freshly activated runtime.
pub struct NpmRefresher<'a> {
    nvm: &'a NvmShell<'a>,
    project_dir: PathBuf,
}

impl<'a> NpmRefresher<'a> {
    pub fn new(nvm: &'a NvmShell<'a>, project_dir: PathBuf) -> Self {
        Self { nvm, project_dir }
    }
}

impl DependencyRefresher for NpmRefresher<'_> {
    fn refresh(&self) -> Result<()> {
        self.nvm.exec_in(&self.project_dir, &["npm", "update"])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanRequest;
    use crate::utils::command::testing::{exit, ok, RecordingRunner};
    use std::cell::RefCell;

    struct FakeDownloader {
        dir: PathBuf,
        fetched: RefCell<Vec<String>>,
    }

    impl Downloader for FakeDownloader {
        fn fetch(&self, url: &str) -> Result<PathBuf> {
            self.fetched.borrow_mut().push(url.to_string());
            let path = self.dir.join("download.tar.xz");
            fs::write(&path, b"archive")?;
            Ok(path)
        }
    }

    struct FakeExtractor {
        staging: PathBuf,
        fail: bool,
    }

    impl ArchiveExtractor for FakeExtractor {
        fn extract(&self, _: &Path) -> Result<PathBuf> {
            if self.fail {
                return Err(UpgradeError::ToolMissing("tar".into()));
            }
            Ok(self.staging.clone())
        }
    }

    #[derive(Default)]
    struct FakeMover {
        moves: RefCell<Vec<(PathBuf, PathBuf)>>,
    }

    impl PrivilegedMover for FakeMover {
        fn move_dir(&self, source: &Path, dest: &Path) -> Result<()> {
            self.moves
                .borrow_mut()
                .push((source.to_path_buf(), dest.to_path_buf()));
            Ok(())
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        runner: RecordingRunner,
        downloader: FakeDownloader,
        extractor: FakeExtractor,
        mover: FakeMover,
    }

    impl Fixture {
        fn new(runner: RecordingRunner, extraction_fails: bool) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let downloader = FakeDownloader {
                dir: dir.path().to_path_buf(),
                fetched: RefCell::new(Vec::new()),
            };
            let extractor = FakeExtractor {
                staging: dir.path().join("node-temp"),
                fail: extraction_fails,
            };
            Self {
                dir,
                runner,
                downloader,
                extractor,
                mover: FakeMover::default(),
            }
        }

        fn nvm_dir(&self) -> PathBuf {
            self.dir.path().join(".nvm")
        }
    }

    fn installer<'a>(
        fixture: &'a Fixture,
        nvm: &'a NvmShell<'a>,
        strategy: InstallStrategy,
    ) -> NodeInstaller<'a> {
        NodeInstaller {
            strategy,
            nvm,
            downloader: &fixture.downloader,
            extractor: &fixture.extractor,
            mover: &fixture.mover,
            nvm_dir: fixture.nvm_dir(),
            dist: DistSite::new("https://nodejs.org/dist", "linux", "x64"),
        }
    }

    fn remote_plan(version: Version) -> InstallPlan {
        PlanRequest::new(version, InstallSource::Remote)
            .into_plan()
            .unwrap()
    }

    #[test]
    fn tool_managed_install_runs_nvm_install() {
        let fixture = Fixture::new(RecordingRunner::succeeding(), false);
        let nvm = NvmShell::new(&fixture.runner, &fixture.nvm_dir());
        let installer = installer(&fixture, &nvm, InstallStrategy::ToolManaged);
        let version = Version::new(22, 9, 0);

        let material = installer.acquire(&remote_plan(version.clone())).unwrap();
        assert_eq!(material, Material::Managed);
        installer.install(&version, &material).unwrap();

        assert_eq!(fixture.runner.commands(), [["nvm", "install", "v22.9.0"]]);
        assert!(fixture.downloader.fetched.borrow().is_empty());
    }

    #[test]
    fn failing_nvm_install_is_an_install_failure() {
        let fixture = Fixture::new(RecordingRunner::new(|_| exit(1)), false);
        let nvm = NvmShell::new(&fixture.runner, &fixture.nvm_dir());
        let installer = installer(&fixture, &nvm, InstallStrategy::ToolManaged);

        let err = installer
            .install(&Version::new(22, 9, 0), &Material::Managed)
            .unwrap_err();
        assert!(matches!(err, UpgradeError::InstallFailed(_)));
    }

    #[test]
    fn manual_placement_downloads_official_archive_then_cleans_up() {
        let fixture = Fixture::new(RecordingRunner::succeeding(), false);
        let nvm = NvmShell::new(&fixture.runner, &fixture.nvm_dir());
        let installer = installer(&fixture, &nvm, InstallStrategy::ManualPlacement);
        let version = Version::new(22, 9, 0);

        let material = installer.acquire(&remote_plan(version.clone())).unwrap();
        let Material::Archive { path, temporary } = &material else {
            panic!("expected an archive, got {:?}", material);
        };
        assert!(*temporary);
        assert!(path.exists());
        assert_eq!(
            *fixture.downloader.fetched.borrow(),
            ["https://nodejs.org/dist/v22.9.0/node-v22.9.0-linux-x64.tar.xz"]
        );

        installer.install(&version, &material).unwrap();
        assert_eq!(
            *fixture.mover.moves.borrow(),
            [(
                fixture.dir.path().join("node-temp"),
                fixture.nvm_dir().join("versions/node/v22.9.0")
            )]
        );
        assert!(!path.exists());
        assert!(fixture.runner.calls.borrow().is_empty());
    }

    #[test]
    fn local_archive_is_used_in_place_and_kept() {
        let fixture = Fixture::new(RecordingRunner::succeeding(), false);
        let nvm = NvmShell::new(&fixture.runner, &fixture.nvm_dir());
        let installer = installer(&fixture, &nvm, InstallStrategy::ToolManaged);

        let archive = fixture.dir.path().join("node-v20.11.0-linux-x64.tar.xz");
        fs::write(&archive, b"archive").unwrap();
        let plan = PlanRequest::from_local_archive(archive.clone())
            .into_plan()
            .unwrap();

        let material = installer.acquire(&plan).unwrap();
        assert_eq!(
            material,
            Material::Archive {
                path: archive.clone(),
                temporary: false
            }
        );
        installer.install(plan.target(), &material).unwrap();

        assert!(archive.exists());
        assert_eq!(fixture.mover.moves.borrow().len(), 1);
        assert!(fixture.downloader.fetched.borrow().is_empty());
    }

    #[test]
    fn network_share_is_downloaded_from_the_given_url() {
        let fixture = Fixture::new(RecordingRunner::succeeding(), false);
        let nvm = NvmShell::new(&fixture.runner, &fixture.nvm_dir());
        let installer = installer(&fixture, &nvm, InstallStrategy::ToolManaged);
        let plan = PlanRequest::new(
            Version::new(22, 9, 0),
            InstallSource::NetworkShare {
                url: "http://share.local/node/node-v22.9.0-linux-x64.tar.xz".into(),
            },
        )
        .into_plan()
        .unwrap();

        let material = installer.acquire(&plan).unwrap();
        assert!(matches!(material, Material::Archive { temporary: true, .. }));
        assert_eq!(
            *fixture.downloader.fetched.borrow(),
            ["http://share.local/node/node-v22.9.0-linux-x64.tar.xz"]
        );
    }

    #[test]
    fn extraction_failure_leaves_version_dir_alone() {
        let fixture = Fixture::new(RecordingRunner::succeeding(), true);
        let nvm = NvmShell::new(&fixture.runner, &fixture.nvm_dir());
        let installer = installer(&fixture, &nvm, InstallStrategy::ManualPlacement);
        let archive = fixture.dir.path().join("node-v22.9.0-linux-x64.tar.xz");
        fs::write(&archive, b"archive").unwrap();

        let err = installer
            .install(
                &Version::new(22, 9, 0),
                &Material::Archive {
                    path: archive.clone(),
                    temporary: true,
                },
            )
            .unwrap_err();

        assert!(matches!(err, UpgradeError::InstallFailed(_)));
        assert!(fixture.mover.moves.borrow().is_empty());
        assert!(archive.exists());
    }

    #[test]
    fn activator_sets_default_alias() {
        let runner = RecordingRunner::new(|_| ok("default -> v22.9.0"));
        let nvm = NvmShell::new(&runner, Path::new("/home/dev/.nvm"));

        NvmActivator::new(&nvm)
            .activate(&Version::new(22, 9, 0))
            .unwrap();
        assert_eq!(runner.commands(), [["nvm", "alias", "default", "v22.9.0"]]);
    }

    #[test]
    fn refresher_runs_npm_update_in_project() {
        let runner = RecordingRunner::succeeding();
        let nvm = NvmShell::new(&runner, Path::new("/home/dev/.nvm"));

        NpmRefresher::new(&nvm, PathBuf::from("/srv/app"))
            .refresh()
            .unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls[0].cwd(), Some(Path::new("/srv/app")));
        assert_eq!(runner.commands(), [["npm", "update"]]);
    }
}
