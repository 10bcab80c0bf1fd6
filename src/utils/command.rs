use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Result, UpgradeError};
use crate::options::verbose;

/// One external program call. Arguments are passed to the OS as-is and are
/// never joined into a shell string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Program followed by its arguments, lossily converted for display and assertions.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub status: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

pub trait CommandRunner {
    /// Runs to completion. With `suppress_errors` a non-zero exit is returned
    /// as a normal output; otherwise it becomes `CommandFailed` carrying stderr.
    fn run(&self, invocation: &Invocation, suppress_errors: bool) -> Result<CommandOutput>;
}

pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, suppress_errors: bool) -> Result<CommandOutput> {
        verbose::debug(&format!("Running {}", invocation));

        let mut command = Command::new(invocation.program());
        command
            .args(invocation.arguments())
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(if suppress_errors {
                Stdio::null()
            } else {
                Stdio::piped()
            });
        if let Some(dir) = invocation.cwd() {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                UpgradeError::ToolMissing(invocation.program().to_string_lossy().into_owned())
            } else {
                UpgradeError::Io(err)
            }
        })?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            status: output.status.code().unwrap_or(-1),
        };
        let status = result.status;

        if !result.success() && !suppress_errors {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            verbose::debug(&format!("{} failed with status {}", invocation, status));
            return Err(UpgradeError::CommandFailed {
                command: invocation.to_string(),
                status,
                stderr: if stderr.is_empty() {
                    format!("exited with code {}", status)
                } else {
                    stderr
                },
            });
        }

        Ok(result)
    }
}

// nvm is a shell function, so every call sources nvm.sh first. The script
// path and the command arrive as positional parameters; `set --` keeps them
// away from nvm.sh's own argument handling.
const NVM_BOOTSTRAP: &str =
    r#"nvm_script="$1"; shift; cmd=("$@"); set --; . "$nvm_script" >/dev/null 2>&1; "${cmd[@]}""#;

// Same, but switches to the `default` alias first. Loading nvm.sh keeps
// whatever version the inherited PATH already points at.
const NVM_DEFAULT_BOOTSTRAP: &str = r#"nvm_script="$1"; shift; cmd=("$@"); set --; . "$nvm_script" >/dev/null 2>&1; nvm use --silent default >/dev/null 2>&1; "${cmd[@]}""#;

/// Runs commands inside a shell that has nvm loaded.
pub struct NvmShell<'a> {
    runner: &'a dyn CommandRunner,
    script: PathBuf,
}

impl<'a> NvmShell<'a> {
    pub fn new(runner: &'a dyn CommandRunner, nvm_dir: &Path) -> Self {
        Self {
            runner,
            script: nvm_dir.join("nvm.sh"),
        }
    }

    pub fn invocation(&self, command: &[&str]) -> Invocation {
        self.bootstrapped(NVM_BOOTSTRAP, command)
    }

    fn bootstrapped(&self, bootstrap: &str, command: &[&str]) -> Invocation {
        Invocation::new("bash")
            .arg("-c")
            .arg(bootstrap)
            .arg(env!("CARGO_PKG_NAME"))
            .arg(&self.script)
            .args(command)
    }

    /// Runs an arbitrary command (e.g. `node --version`) with nvm loaded and
    /// returns its trimmed stdout.
    pub fn exec(&self, command: &[&str]) -> Result<String> {
        Ok(self.runner.run(&self.invocation(command), false)?.stdout)
    }

    /// Like `exec`, in a shell switched to nvm's `default` version, i.e. what
    /// a new terminal would get.
    pub fn exec_default(&self, command: &[&str]) -> Result<String> {
        let invocation = self.bootstrapped(NVM_DEFAULT_BOOTSTRAP, command);
        Ok(self.runner.run(&invocation, false)?.stdout)
    }

    pub fn exec_in(&self, dir: &Path, command: &[&str]) -> Result<String> {
        let invocation = self.invocation(command).current_dir(dir);
        Ok(self.runner.run(&invocation, false)?.stdout)
    }

    pub fn nvm(&self, args: &[&str]) -> Result<String> {
        let mut command = Vec::with_capacity(args.len() + 1);
        command.push("nvm");
        command.extend_from_slice(args);
        self.exec(&command)
    }

    /// `nvm --version`; fails when nvm.sh cannot be loaded.
    pub fn version(&self) -> Result<String> {
        if !self.script.is_file() {
            return Err(UpgradeError::ToolMissing(format!(
                "nvm ({} not found)",
                self.script.display()
            )));
        }
        self.nvm(&["--version"])
    }
}
