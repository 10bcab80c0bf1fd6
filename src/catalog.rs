use crate::error::{Result, UpgradeError};
use crate::utils::command::NvmShell;
use crate::version::Version;

/// Even-major releases in the order the upstream listing published them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    versions: Vec<Version>,
}

impl Catalog {
    pub fn new(versions: Vec<Version>) -> Self {
        Self { versions }
    }

    /// Keeps the lines whose first field is a version with an even major.
    ///
    /// Lines without a `v` marker are headers or blank and are skipped, as is
    /// nvm's leading `->` arrow on the currently active release.
    pub fn filter_even_lts<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let versions = lines
            .into_iter()
            .filter(|line| line.contains(['v', 'V']))
            .filter_map(|line| {
                let mut fields = line.split_whitespace().skip_while(|field| *field == "->");
                fields.next()
            })
            .filter_map(|field| Version::parse(field).ok())
            .filter(Version::is_even_major)
            .collect();

        Self::new(versions)
    }

    pub fn from_listing(listing: &str) -> Self {
        Self::filter_even_lts(listing.lines())
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Version> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn newest(&self) -> Option<&Version> {
        self.versions.iter().max()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Version;
    type IntoIter = std::slice::Iter<'a, Version>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Fetches `nvm ls-remote --lts` and filters it.
pub fn fetch(nvm: &NvmShell<'_>) -> Result<Catalog> {
    let listing = nvm
        .nvm(&["ls-remote", "--lts", "--no-colors"])
        .map_err(|err| UpgradeError::CatalogUnavailable(err.to_string()))?;

    Ok(Catalog::from_listing(&listing))
}
