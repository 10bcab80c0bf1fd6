use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, UpgradeError};

/// A Node.js release number. Always rendered with the `v` marker; the marker
/// is not part of equality or ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(semver::Version);

fn exact_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[vV]?([0-9]+)\.([0-9]+)\.([0-9]+)$").expect("version pattern compiles")
    })
}

fn embedded_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)v?[0-9]+\.[0-9]+\.[0-9]+").expect("embedded version pattern compiles")
    })
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    /// Parses `vX.Y.Z` or `X.Y.Z`. Surrounding whitespace and quote characters
    /// are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let cleaned = text.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'');
        let invalid = || UpgradeError::InvalidFormat(text.trim().to_string());

        let caps = exact_pattern().captures(cleaned).ok_or_else(invalid)?;
        let component = |index: usize| caps[index].parse::<u64>().map_err(|_| invalid());

        Ok(Self::new(component(1)?, component(2)?, component(3)?))
    }

    /// Finds the first `X.Y.Z` (optionally `v`-prefixed) inside a file name,
    /// e.g. `node-v18.16.0-linux-x64.tar.xz`.
    pub fn extract_from_filename(name: &str) -> Option<Self> {
        let found = embedded_pattern().find(name)?;
        Self::parse(found.as_str()).ok()
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    pub fn compare_major(&self, other: &Version) -> Ordering {
        self.major().cmp(&other.major())
    }

    pub fn is_even_major(&self) -> bool {
        self.major() % 2 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

impl FromStr for Version {
    type Err = UpgradeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}
