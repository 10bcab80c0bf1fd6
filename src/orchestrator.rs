use std::path::PathBuf;

use colored::Colorize;

use crate::error::Result;
use crate::options::verbose;
use crate::plan::{InstallPlan, InstallSource, PlanRequest, UpgradeResult};
use crate::prompt::Prompter;
use crate::state::{self, VersionProbe};
use crate::version::Version;

/// What the acquire step produced for the install step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Material {
    /// The version manager fetches and installs by itself.
    Managed,
    /// An archive on disk. `temporary` archives were downloaded by us and are
    /// removed after a successful install.
    Archive { path: PathBuf, temporary: bool },
}

pub trait Installer {
    fn acquire(&self, plan: &InstallPlan) -> Result<Material>;
    fn install(&self, version: &Version, material: &Material) -> Result<()>;
}

pub trait Activator {
    fn activate(&self, version: &Version) -> Result<()>;
}

pub trait StateStore {
    fn write_pin(&self, version: &Version) -> Result<()>;
    fn record_preferences(&self, version: &Version, source: &InstallSource) -> Result<()>;
}

pub trait DependencyRefresher {
    fn refresh(&self) -> Result<()>;
}

pub struct Orchestrator<'a> {
    pub probe: &'a dyn VersionProbe,
    pub installer: &'a dyn Installer,
    pub activator: &'a dyn Activator,
    pub store: &'a dyn StateStore,
    pub refresher: &'a dyn DependencyRefresher,
    pub prompter: &'a dyn Prompter,
}

impl Orchestrator<'_> {
    /// Runs one upgrade. Acquire and install failures end the run with the
    /// underlying error; a failed activation is reported as `activated: false`
    /// and leaves the pin file and preferences untouched. Once the runtime is
    /// active, persisting it can only produce warnings.
    pub fn execute(&self, request: PlanRequest) -> Result<UpgradeResult> {
        let plan = request.into_plan()?;
        let target = plan.target();

        if state::is_installed(target, self.probe) {
            println!("{}", format!("Node.js {} is already installed.", target).yellow());
        } else {
            println!("Installing Node.js {} from {}...", target, plan.source());
            let material = self.installer.acquire(&plan)?;
            self.installer.install(target, &material)?;
            println!("{}", format!("Node.js {} installed.", target).green());
        }

        let activated = self.activate(target);
        if activated {
            self.persist(target, plan.source());
        }

        Ok(UpgradeResult {
            installed_version: Some(target.clone()),
            activated,
        })
    }

    fn activate(&self, target: &Version) -> bool {
        println!("Activating Node.js {}...", target);
        if let Err(err) = self.activator.activate(target) {
            verbose::error(&format!("Could not activate {}: {}", target, err));
            return false;
        }

        match state::current_version(self.probe) {
            Some(active) if &active == target => {
                verbose::info(&format!("Node.js {} is now active", target));
                true
            }
            Some(active) => {
                verbose::error(&format!(
                    "Active version ({}) does not match the installed version ({})",
                    active, target
                ));
                false
            }
            None => false,
        }
    }

    fn persist(&self, target: &Version, source: &InstallSource) {
        if let Err(err) = self.store.write_pin(target) {
            verbose::warn(&format!("Could not write the version pin: {}", err));
        }
        if let Err(err) = self.store.record_preferences(target, source) {
            verbose::warn(&format!("Could not save preferences: {}", err));
        }
        if let Err(err) = self.offer_dependency_refresh() {
            verbose::warn(&format!("Dependency update skipped: {}", err));
        }
    }

    fn offer_dependency_refresh(&self) -> Result<()> {
        let wanted = self
            .prompter
            .confirm("Update the project's dependencies for the new Node.js version?")?;
        if !wanted {
            return Ok(());
        }

        println!("Updating dependencies...");
        match self.refresher.refresh() {
            Ok(()) => println!("{}", "Dependencies updated.".green()),
            Err(err) => verbose::warn(&format!("Dependency update failed: {}", err)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpgradeError;
    use crate::prompt::testing::ScriptedPrompter;
    use std::cell::{Cell, RefCell};

    struct FakeProbe {
        installed: bool,
        active: RefCell<Option<Version>>,
    }

    impl VersionProbe for FakeProbe {
        fn version_dir_exists(&self, _: &Version) -> bool {
            self.installed
        }

        fn listed_by_tool(&self, _: &Version) -> Result<bool> {
            Ok(false)
        }

        fn active_version(&self) -> Result<Version> {
            self.active
                .borrow()
                .clone()
                .ok_or_else(|| UpgradeError::ToolMissing("node".into()))
        }
    }

    #[derive(Default)]
    struct FakeInstaller {
        steps: RefCell<Vec<String>>,
        fail_acquire: bool,
    }

    impl Installer for FakeInstaller {
        fn acquire(&self, plan: &InstallPlan) -> Result<Material> {
            self.steps.borrow_mut().push(format!("acquire {}", plan.target()));
            if self.fail_acquire {
                return Err(UpgradeError::NotFound(
                    "https://nodejs.org/dist/v99.0.0/node-v99.0.0-linux-x64.tar.xz".into(),
                ));
            }
            Ok(Material::Managed)
        }

        fn install(&self, version: &Version, _: &Material) -> Result<()> {
            self.steps.borrow_mut().push(format!("install {}", version));
            Ok(())
        }
    }

    /// Makes the probe report `reports` as active once called.
    struct FakeActivator<'a> {
        probe: &'a FakeProbe,
        reports: Option<Version>,
        calls: Cell<usize>,
    }

    impl Activator for FakeActivator<'_> {
        fn activate(&self, _: &Version) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            *self.probe.active.borrow_mut() = self.reports.clone();
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeStore {
        pins: RefCell<Vec<Version>>,
        preferences: RefCell<Vec<(Version, InstallSource)>>,
    }

    impl StateStore for FakeStore {
        fn write_pin(&self, version: &Version) -> Result<()> {
            self.pins.borrow_mut().push(version.clone());
            Ok(())
        }

        fn record_preferences(&self, version: &Version, source: &InstallSource) -> Result<()> {
            self.preferences
                .borrow_mut()
                .push((version.clone(), source.clone()));
            Ok(())
        }
    }

    struct ReadOnlyStore;

    impl StateStore for ReadOnlyStore {
        fn write_pin(&self, _: &Version) -> Result<()> {
            Err(UpgradeError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only project",
            )))
        }

        fn record_preferences(&self, _: &Version, _: &InstallSource) -> Result<()> {
            Err(UpgradeError::Config("config.json is not writable".into()))
        }
    }

    #[derive(Default)]
    struct FakeRefresher {
        calls: Cell<usize>,
    }

    impl DependencyRefresher for FakeRefresher {
        fn refresh(&self) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            Err(UpgradeError::ToolMissing("npm".into()))
        }
    }

    fn probe(installed: bool, active: Option<Version>) -> FakeProbe {
        FakeProbe {
            installed,
            active: RefCell::new(active),
        }
    }

    fn v22() -> Version {
        Version::new(22, 9, 0)
    }

    #[test]
    fn installs_activates_and_persists() {
        let probe = probe(false, Some(Version::new(20, 11, 0)));
        let installer = FakeInstaller::default();
        let activator = FakeActivator {
            probe: &probe,
            reports: Some(v22()),
            calls: Cell::new(0),
        };
        let store = FakeStore::default();
        let refresher = FakeRefresher::default();
        let prompter = ScriptedPrompter::new(&["y"]);

        let orchestrator = Orchestrator {
            probe: &probe,
            installer: &installer,
            activator: &activator,
            store: &store,
            refresher: &refresher,
            prompter: &prompter,
        };
        let result = orchestrator
            .execute(PlanRequest::new(v22(), InstallSource::Remote))
            .unwrap();

        assert_eq!(
            result,
            UpgradeResult {
                installed_version: Some(v22()),
                activated: true
            }
        );
        assert_eq!(*installer.steps.borrow(), ["acquire v22.9.0", "install v22.9.0"]);
        assert_eq!(*store.pins.borrow(), [v22()]);
        assert_eq!(*store.preferences.borrow(), [(v22(), InstallSource::Remote)]);
        // refresh failure is only logged
        assert_eq!(refresher.calls.get(), 1);
    }

    #[test]
    fn already_installed_skips_straight_to_activation() {
        let probe = probe(true, Some(Version::new(20, 11, 0)));
        let installer = FakeInstaller::default();
        let activator = FakeActivator {
            probe: &probe,
            reports: Some(v22()),
            calls: Cell::new(0),
        };
        let store = FakeStore::default();
        let refresher = FakeRefresher::default();
        let prompter = ScriptedPrompter::new(&["n"]);

        let result = Orchestrator {
            probe: &probe,
            installer: &installer,
            activator: &activator,
            store: &store,
            refresher: &refresher,
            prompter: &prompter,
        }
        .execute(PlanRequest::new(v22(), InstallSource::Remote))
        .unwrap();

        assert!(result.activated);
        assert!(installer.steps.borrow().is_empty());
        assert_eq!(activator.calls.get(), 1);
        assert_eq!(refresher.calls.get(), 0);
    }

    #[test]
    fn activation_mismatch_is_reported_without_persisting() {
        let probe = probe(false, Some(Version::new(20, 11, 0)));
        let installer = FakeInstaller::default();
        let activator = FakeActivator {
            probe: &probe,
            reports: Some(Version::new(20, 11, 0)),
            calls: Cell::new(0),
        };
        let store = FakeStore::default();
        let refresher = FakeRefresher::default();
        let prompter = ScriptedPrompter::new(&[]);

        let result = Orchestrator {
            probe: &probe,
            installer: &installer,
            activator: &activator,
            store: &store,
            refresher: &refresher,
            prompter: &prompter,
        }
        .execute(PlanRequest::new(v22(), InstallSource::Remote))
        .unwrap();

        assert_eq!(
            result,
            UpgradeResult {
                installed_version: Some(v22()),
                activated: false
            }
        );
        assert!(store.pins.borrow().is_empty());
        assert!(store.preferences.borrow().is_empty());
        assert!(prompter.asked.borrow().is_empty());
    }

    #[test]
    fn acquire_failure_aborts_before_install() {
        let probe = probe(false, None);
        let installer = FakeInstaller {
            fail_acquire: true,
            ..FakeInstaller::default()
        };
        let activator = FakeActivator {
            probe: &probe,
            reports: None,
            calls: Cell::new(0),
        };
        let store = FakeStore::default();
        let refresher = FakeRefresher::default();
        let prompter = ScriptedPrompter::new(&[]);

        let err = Orchestrator {
            probe: &probe,
            installer: &installer,
            activator: &activator,
            store: &store,
            refresher: &refresher,
            prompter: &prompter,
        }
        .execute(PlanRequest::new(Version::new(99, 0, 0), InstallSource::Remote))
        .unwrap_err();

        assert!(matches!(err, UpgradeError::NotFound(_)));
        assert_eq!(*installer.steps.borrow(), ["acquire v99.0.0"]);
        assert_eq!(activator.calls.get(), 0);
        assert!(store.pins.borrow().is_empty());
    }

    #[test]
    fn archive_without_version_is_rejected_before_installing() {
        let probe = probe(false, None);
        let installer = FakeInstaller::default();
        let activator = FakeActivator {
            probe: &probe,
            reports: None,
            calls: Cell::new(0),
        };
        let store = FakeStore::default();
        let refresher = FakeRefresher::default();
        let prompter = ScriptedPrompter::new(&[]);

        let err = Orchestrator {
            probe: &probe,
            installer: &installer,
            activator: &activator,
            store: &store,
            refresher: &refresher,
            prompter: &prompter,
        }
        .execute(PlanRequest::from_local_archive(PathBuf::from(
            "/tmp/node-latest-linux-x64.tar.xz",
        )))
        .unwrap_err();

        assert!(matches!(err, UpgradeError::MissingTargetVersion(_)));
        assert!(installer.steps.borrow().is_empty());
        assert_eq!(activator.calls.get(), 0);
    }

    #[test]
    fn persistence_failure_keeps_activated_result() {
        let probe = probe(false, Some(Version::new(20, 11, 0)));
        let installer = FakeInstaller::default();
        let activator = FakeActivator {
            probe: &probe,
            reports: Some(v22()),
            calls: Cell::new(0),
        };
        let refresher = FakeRefresher::default();
        // input closed before the refresh question
        let prompter = ScriptedPrompter::new(&[]);

        let result = Orchestrator {
            probe: &probe,
            installer: &installer,
            activator: &activator,
            store: &ReadOnlyStore,
            refresher: &refresher,
            prompter: &prompter,
        }
        .execute(PlanRequest::new(v22(), InstallSource::Remote))
        .unwrap();

        assert_eq!(
            result,
            UpgradeResult {
                installed_version: Some(v22()),
                activated: true
            }
        );
        assert_eq!(prompter.asked.borrow().len(), 1);
        assert_eq!(refresher.calls.get(), 0);
    }
}
