use std::fs;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;

use crate::error::Result;
use crate::options::verbose;
use crate::utils::command::{CommandRunner, Invocation};

pub trait ArchiveExtractor {
    /// Unpacks `archive` into a fresh staging directory, dropping the
    /// archive's top-level folder, and returns that directory.
    fn extract(&self, archive: &Path) -> Result<PathBuf>;
}

pub struct TarExtractor<'a> {
    staging_dir: PathBuf,
    runner: &'a dyn CommandRunner,
}

impl<'a> TarExtractor<'a> {
    pub fn new(staging_dir: PathBuf, runner: &'a dyn CommandRunner) -> Self {
        Self {
            staging_dir,
            runner,
        }
    }
}

impl ArchiveExtractor for TarExtractor<'_> {
    fn extract(&self, archive: &Path) -> Result<PathBuf> {
        verbose::info(&format!(
            "Extracting {} into {}",
            archive.display(),
            self.staging_dir.display()
        ));

        if self.staging_dir.exists() {
            fs::remove_dir_all(&self.staging_dir)?;
        }
        fs::create_dir_all(&self.staging_dir)?;

        let name = archive
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            extract_tar_gz(archive, &self.staging_dir)?;
        } else {
            // xz and pkg payloads go through the system tar
            let invocation = Invocation::new("tar")
                .arg("-xf")
                .arg(archive)
                .arg("-C")
                .arg(&self.staging_dir)
                .arg("--strip-components=1");
            self.runner.run(&invocation, false)?;
        }

        verbose::info("Archive extracted");
        Ok(self.staging_dir.clone())
    }
}

fn extract_tar_gz(archive_path: &Path, extract_dir: &Path) -> Result<()> {
    let file = fs::File::open(archive_path)?;
    let decompressed = GzDecoder::new(file);
    let mut archive = tar::Archive::new(decompressed);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let Some(relative) = strip_top_level(&path) else {
            continue;
        };

        let target = extract_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
    }

    Ok(())
}

/// Drops the first path component. Entries that would escape the destination
/// or that are the top-level folder itself yield `None`.
fn strip_top_level(path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    components.next()?;

    let mut stripped = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => stripped.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if stripped.as_os_str().is_empty() {
        None
    } else {
        Some(stripped)
    }
}
