use std::ffi::OsString;
use std::path::Path;

use crate::error::Result;
use crate::options::verbose;
use crate::utils::command::{CommandRunner, Invocation};

pub trait PrivilegedMover {
    /// Copies the contents of `source` into `dest` (created when missing) and
    /// removes `source` only once the copy has succeeded.
    fn move_dir(&self, source: &Path, dest: &Path) -> Result<()>;
}

/// mkdir / cp / rm through the runner, optionally under `sudo`.
pub struct CommandMover<'a> {
    runner: &'a dyn CommandRunner,
    privileged: bool,
    owner: Option<String>,
}

impl<'a> CommandMover<'a> {
    pub fn new(runner: &'a dyn CommandRunner, privileged: bool) -> Self {
        Self {
            runner,
            privileged,
            owner: None,
        }
    }

    /// After a privileged copy, hand the tree back to this user so nvm can
    /// manage it.
    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner.filter(|name| !name.is_empty());
        self
    }

    fn tool(&self, program: &str) -> Invocation {
        if self.privileged {
            Invocation::new("sudo").arg(program)
        } else {
            Invocation::new(program)
        }
    }
}

impl PrivilegedMover for CommandMover<'_> {
    fn move_dir(&self, source: &Path, dest: &Path) -> Result<()> {
        verbose::info(&format!(
            "Moving {} to {}",
            source.display(),
            dest.display()
        ));

        let mut contents = OsString::from(source.as_os_str());
        contents.push("/.");

        self.runner
            .run(&self.tool("mkdir").arg("-p").arg(dest), false)?;
        self.runner
            .run(&self.tool("cp").arg("-R").arg(&contents).arg(dest), false)?;

        if self.privileged {
            if let Some(owner) = &self.owner {
                self.runner
                    .run(&self.tool("chown").arg("-R").arg(owner).arg(dest), false)?;
            }
        }

        self.runner
            .run(&self.tool("rm").arg("-rf").arg(source), false)?;

        verbose::info(&format!("Moved {} to {}", source.display(), dest.display()));
        Ok(())
    }
}
