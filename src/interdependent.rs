//! Joint closability of paths that share rotatable bonds.
//!
//! Two chosen chords whose paths cross the same rotatable bond can only be
//! closed together if some closing conformation of each path agrees on the
//! torsion of every shared bond.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::{
    geometry::angular_distance,
    molecule::BondIx,
    path::ChainPath,
};

/// Unordered pair of ring-closing vertex positions, smaller first.
pub type PairKey = (usize, usize);

/// Rotatable bond -> pairs whose path crosses it, for every bond crossed by
/// at least two paths that do not share an end.
pub fn interdependency_map(paths: &BTreeMap<PairKey, ChainPath>) -> BTreeMap<BondIx, BTreeSet<PairKey>> {
    let mut map: BTreeMap<BondIx, BTreeSet<PairKey>> = BTreeMap::new();
    let entries: Vec<_> = paths.iter().collect();
    for (i, (ka, pa)) in entries.iter().enumerate() {
        for (kb, pb) in &entries[i + 1..] {
            if pa.shares_endpoint(pb) {
                continue;
            }
            for bond in pa.shared_rotatable_bonds(pb) {
                let set = map.entry(bond).or_default();
                set.insert(**ka);
                set.insert(**kb);
            }
        }
    }
    if !map.is_empty() {
        debug!(bonds = map.len(), "interdependent paths found");
    }
    map
}

/// Groups of chosen pairs that share some rotatable bond.
pub fn interdependent_groups(
    chosen: &[PairKey],
    interdependency: &BTreeMap<BondIx, BTreeSet<PairKey>>,
) -> Vec<Vec<PairKey>> {
    let mut groups: Vec<Vec<PairKey>> = Vec::new();
    for members in interdependency.values() {
        let group: Vec<PairKey> = chosen.iter().copied().filter(|k| members.contains(k)).collect();
        if group.len() > 1 && !groups.contains(&group) {
            groups.push(group);
        }
    }
    groups
}

pub fn has_interdependent_paths(chosen: &[PairKey], interdependency: &BTreeMap<BondIx, BTreeSet<PairKey>>) -> bool {
    !interdependent_groups(chosen, interdependency).is_empty()
}

/// One closing conformation of one path.
#[derive(Debug, Clone, Copy)]
pub struct ClosableConf<'a> {
    bonds: &'a [BondIx],
    angles: &'a [f64],
}

impl<'a> ClosableConf<'a> {
    pub fn new(bonds: &'a [BondIx], angles: &'a [f64]) -> Self {
        Self { bonds, angles }
    }

    pub fn shares_bond(&self, other: &ClosableConf) -> bool {
        self.bonds.iter().any(|b| other.bonds.contains(b))
    }

    /// Every shared bond has torsions within `threshold` degrees.
    pub fn can_coexist_with(&self, other: &ClosableConf, threshold: f64) -> bool {
        self.bonds.iter().zip(self.angles).all(|(bond, angle)| {
            match other.bonds.iter().position(|b| b == bond) {
                Some(j) => other
                    .angles
                    .get(j)
                    .map_or(true, |theirs| angular_distance(*angle, *theirs) <= threshold),
                None => true,
            }
        })
    }
}

struct Member<'a> {
    bonds: &'a [BondIx],
    conformations: &'a [Vec<f64>],
}

/// Whether every group of interdependent chosen paths admits one closing
/// conformation per path, all pairwise compatible.
///
/// Paths whose conformations are unknown (long chains that skipped the
/// search) do not constrain their group.
pub fn check_closability_of_interdependent_paths(
    chosen: &[PairKey],
    interdependency: &BTreeMap<BondIx, BTreeSet<PairKey>>,
    paths: &BTreeMap<PairKey, ChainPath>,
    step: f64,
) -> bool {
    let threshold = step / 2.0;
    for group in interdependent_groups(chosen, interdependency) {
        let members: Vec<Member> = group
            .iter()
            .filter_map(|k| paths.get(k))
            .filter_map(|p| {
                let geometry = p.geometry()?;
                let rcc = p.conformations()?;
                (!rcc.is_empty()).then(|| Member {
                    bonds: &geometry.bonds,
                    conformations: rcc.conformations(),
                })
            })
            .collect();
        if members.len() < 2 {
            continue;
        }
        if !jointly_closable(&members, threshold) {
            trace!(?group, "interdependent paths cannot close together");
            return false;
        }
    }
    true
}

/// Depth-first choice of one conformation per member.
fn jointly_closable(members: &[Member], threshold: f64) -> bool {
    let mut chosen: Vec<ClosableConf> = Vec::with_capacity(members.len());
    let mut cursors = vec![0usize];
    loop {
        let level = cursors.len() - 1;
        let idx = cursors[level];
        if idx == members[level].conformations.len() {
            cursors.pop();
            if cursors.is_empty() {
                return false;
            }
            chosen.pop();
            continue;
        }
        cursors[level] += 1;

        let conf = ClosableConf::new(members[level].bonds, &members[level].conformations[idx]);
        if chosen.iter().all(|c| c.can_coexist_with(&conf, threshold)) {
            if level + 1 == members.len() {
                return true;
            }
            chosen.push(conf);
            cursors.push(0);
        }
    }
}
