use std::collections::BTreeMap;

use crate::molecule::Molecule;

/// Substructure matcher used by the constitutional closability check.
///
/// Given named patterns, returns how many times each one matches. Patterns
/// the matcher does not know about may simply be left out of the result.
pub trait PatternMatcher: Send + Sync {
    fn count_matches(
        &self,
        molecule: &Molecule,
        patterns: &BTreeMap<String, String>,
    ) -> anyhow::Result<BTreeMap<String, usize>>;
}

impl<F> PatternMatcher for F
where
    F: Fn(&Molecule, &BTreeMap<String, String>) -> anyhow::Result<BTreeMap<String, usize>> + Send + Sync,
{
    fn count_matches(
        &self,
        molecule: &Molecule,
        patterns: &BTreeMap<String, String>,
    ) -> anyhow::Result<BTreeMap<String, usize>> {
        self(molecule, patterns)
    }
}
