use std::cmp::Ordering;

use crate::catalog::Catalog;
use crate::version::Version;

/// Newest release of the line two majors above `current`, e.g. v20 -> v22.
///
/// The catalog is in publication order, so the last entry for the target major
/// is the newest one. `None` means the operator has to pick manually.
pub fn next_even_major(current: &Version, catalog: &Catalog) -> Option<Version> {
    let target_line = Version::new(current.major().checked_add(2)?, 0, 0);

    catalog
        .iter()
        .filter(|candidate| candidate.compare_major(&target_line) == Ordering::Equal)
        .last()
        .cloned()
}
