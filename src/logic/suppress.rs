//! Merge & Suppression
//!
//! A secondary manager must not install a dependency the native manager
//! already supplies. Suppression is one-directional and decided per logical
//! name, only after native and secondary resolution have both completed.
//!
//! | Native entry       | Secondary entry | Result          |
//! |--------------------|-----------------|-----------------|
//! | names              | anything        | remove          |
//! | remove (`null`)    | names           | kept            |
//! | (not requested)    | names           | kept            |

use crate::logic::resolver::{ManagerResolution, ResolutionSet, ResolvedMapping};
use crate::mapping::CandidateValue;

/// Force every secondary entry that the native mapping already supplies to
/// `CandidateValue::Remove`.
pub fn suppress(secondary: &ResolvedMapping, native: &ResolvedMapping) -> ResolvedMapping {
    secondary
        .iter()
        .map(|(package, candidate)| {
            let supplied = native.get(package).is_some_and(|value| !value.is_remove());
            if supplied && !candidate.is_remove() {
                tracing::debug!(%package, "already supplied natively, suppressing");
                (package.clone(), CandidateValue::Remove)
            } else {
                (package.clone(), candidate.clone())
            }
        })
        .collect()
}

/// Apply [`suppress`] to every secondary manager of a resolution set
pub fn suppress_all(set: ResolutionSet) -> ResolutionSet {
    let secondaries = set
        .secondaries
        .iter()
        .map(|resolution| ManagerResolution {
            manager: resolution.manager.clone(),
            mapping: suppress(&resolution.mapping, &set.native.mapping),
        })
        .collect();

    ResolutionSet {
        native: set.native,
        secondaries,
    }
}
