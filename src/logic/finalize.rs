//! Flattener / Deduplicator / Sorter
//!
//! Turns a resolved mapping into the final package list handed to the
//! installer dispatcher. Steps run strictly in this order:
//!
//! 1. expand list values, treat single names as one-element lists
//! 2. drop remove sentinels and empty names
//! 3. deduplicate by exact string equality
//! 4. sort by byte order (`str::cmp`), independent of locale
//!
//! The output depends only on the set of names in the mapping, so running it
//! twice on the same mapping yields the same list.

use std::collections::BTreeSet;

use crate::logic::resolver::ResolvedMapping;

/// Flatten, deduplicate and sort the concrete names of a resolved mapping
pub fn finalize(mapping: &ResolvedMapping) -> Vec<String> {
    finalize_names(mapping.values().flat_map(|candidate| candidate.names()))
}

/// Same as [`finalize`] for an arbitrary sequence of concrete names
pub fn finalize_names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    // BTreeSet gives dedup and byte-order sorting in one pass
    let unique: BTreeSet<&str> = names
        .into_iter()
        .map(String::as_str)
        .filter(|name| !name.trim().is_empty())
        .collect();

    unique.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::CandidateValue;

    fn mapping(entries: &[(&str, CandidateValue)]) -> ResolvedMapping {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_finalize_expands_lists() {
        let resolved = mapping(&[("L", vec!["x", "y"].into())]);
        assert_eq!(finalize(&resolved), vec!["x", "y"]);
    }

    #[test]
    fn test_finalize_drops_remove_and_empty() {
        let resolved = mapping(&[
            ("a", CandidateValue::Remove),
            ("b", "".into()),
            ("c", vec!["", "  ", "gcc"].into()),
        ]);
        assert_eq!(finalize(&resolved), vec!["gcc"]);
    }

    #[test]
    fn test_finalize_dedupes_across_entries() {
        let resolved = mapping(&[
            ("meson", vec!["meson", "ninja-build"].into()),
            ("ninja", "ninja-build".into()),
        ]);
        assert_eq!(finalize(&resolved), vec!["meson", "ninja-build"]);
    }

    #[test]
    fn test_finalize_sorts_by_bytes() {
        let resolved = mapping(&[
            ("z", "zeta".into()),
            ("a", "alpha".into()),
            ("B", "Zlib".into()),
        ]);
        // Uppercase sorts before lowercase in byte order
        assert_eq!(finalize(&resolved), vec!["Zlib", "alpha", "zeta"]);
    }

    #[test]
    fn test_finalize_empty_mapping() {
        assert!(finalize(&ResolvedMapping::new()).is_empty());
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let resolved = mapping(&[
            ("a", vec!["y", "x", "y"].into()),
            ("b", "w".into()),
        ]);
        assert_eq!(finalize(&resolved), finalize(&resolved));

        let once = finalize(&resolved);
        assert_eq!(finalize_names(&once), once);
    }
}
