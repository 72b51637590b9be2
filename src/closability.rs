//! Decide whether a candidate path can become a ring.

use std::collections::HashSet;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    archive::RingClosingConformations,
    context::RingClosureContext,
    error::{Error, Result},
    graph::{AssemblyGraph, VertexIx},
    molecule::{AtomIx, Molecule},
    path::{ChainPath, ClosabilityState},
    torsion::TorsionalSearch,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClosabilityMode {
    /// Any pair accepted by the ring-size bookkeeping is closable.
    RingSize,
    /// Required ring elements and/or constitutional patterns.
    Constitution,
    /// Torsional search for ring-closing conformations.
    Geometry,
    /// Constitution and geometry must both agree.
    Both,
}

pub struct ClosabilityEvaluator<'a> {
    ctx: &'a RingClosureContext,
}

impl<'a> ClosabilityEvaluator<'a> {
    pub fn new(ctx: &'a RingClosureContext) -> Self {
        Self { ctx }
    }

    /// Evaluate `path` and record the verdict in its state.
    pub fn is_closable(&self, path: &mut ChainPath, graph: &AssemblyGraph, molecule: &Molecule) -> Result<bool> {
        path.set_state(ClosabilityState::Evaluating);
        let verdict = match self.ctx.params().mode {
            ClosabilityMode::RingSize => true,
            ClosabilityMode::Constitution => self.constitution(path, graph, molecule)?.unwrap_or(true),
            ClosabilityMode::Geometry => self.geometry(path, graph, molecule)?,
            ClosabilityMode::Both => match self.constitution(path, graph, molecule)? {
                Some(false) => false,
                _ => self.geometry(path, graph, molecule)?,
            },
        };

        if verdict {
            path.set_state(ClosabilityState::Closed);
        } else {
            path.set_state(ClosabilityState::Rejected);
            self.ctx.stats().count_rejected_pair();
            debug!(path = %path, "path is not closable");
        }
        Ok(verdict)
    }

    /// Constitutional verdict, or `None` if no constitutional rule is set.
    pub fn constitution(
        &self,
        path: &ChainPath,
        graph: &AssemblyGraph,
        molecule: &Molecule,
    ) -> Result<Option<bool>> {
        let params = self.ctx.params();
        if params.required_ring_elements.is_empty() && params.constitutional_patterns.is_empty() {
            return Ok(None);
        }

        let on_path: HashSet<VertexIx> = path.vertices().iter().copied().collect();
        let is_core = |ix: AtomIx| {
            molecule
                .atom(ix)
                .is_some_and(|a| !a.is_attractor() && on_path.contains(&a.vertex()))
        };
        let source = |v: VertexIx| {
            molecule
                .attractor_of(v)
                .and_then(|rca| molecule.source_of(rca))
                .ok_or_else(|| Error::structural(format!("no attractor source atom on vertex {v:?}")))
        };
        let (src_h, src_t) = (source(path.head())?, source(path.tail())?);

        let mut closable = false;
        if !params.required_ring_elements.is_empty() {
            let ring = molecule.shortest_path(src_h, src_t, is_core).unwrap_or_default();
            let spans = ring.iter().any(|ix| {
                molecule.atom(*ix).is_some_and(|a| {
                    let sym = a.symbol();
                    params.required_ring_elements.iter().any(|el| *el == sym)
                })
            });
            if !spans {
                debug!(path = %path, "ring would not contain any required element");
                return Ok(Some(false));
            }
            closable = true;
        }

        if !params.constitutional_patterns.is_empty() {
            let pruned = pruned_with_chord(path, graph, molecule, &is_core, (src_h, src_t));
            closable = match self.ctx.matcher() {
                None => {
                    warn!("constitutional patterns configured but no pattern matcher available");
                    false
                }
                Some(matcher) => match matcher.count_matches(&pruned, &params.constitutional_patterns) {
                    Ok(counts) => counts.values().any(|n| *n > 0),
                    Err(e) => {
                        warn!(error = %e, "pattern matching failed, ignoring");
                        false
                    }
                },
            };
        }
        debug!(path = %path, closable, "constitutional closability");
        Ok(Some(closable))
    }

    fn geometry(&self, path: &mut ChainPath, graph: &AssemblyGraph, molecule: &Molecule) -> Result<bool> {
        let params = self.ctx.params();
        let archive = self.ctx.archive();

        if let Some(hit) = archive.lookup(path.alternative_ids()) {
            self.ctx.stats().count_archive_hit();
            debug!(path = %path, closable = hit.closable, "archived closability");
            if hit.closable && params.check_interdependent_chains && params.exhaustive_search {
                if !self.materialize(path, graph, molecule, false)? {
                    return Ok(false);
                }
                path.set_conformations(archive.conformations(&hit)?);
            }
            return Ok(hit.closable);
        }

        if !self.materialize(path, graph, molecule, true)? {
            return Ok(false);
        }
        let Some(geometry) = path.geometry() else {
            return Ok(false);
        };
        self.ctx.stats().count_torsional_search();
        let outcome = TorsionalSearch::new(params)?.evaluate(
            &geometry.points,
            &geometry.rotatable,
            &geometry.dihedral_refs,
        )?;
        let rcc = RingClosingConformations::new(path.chain_id(), outcome.conformations);
        archive.store_entry(path.chain_id(), outcome.closable, &rcc)?;
        if outcome.closable {
            path.set_conformations(Some(rcc));
        }
        Ok(outcome.closable)
    }

    /// Collaborator failures make the path not closable; anything else is
    /// propagated.
    fn materialize(&self, path: &mut ChainPath, graph: &AssemblyGraph, molecule: &Molecule, make_3d: bool) -> Result<bool> {
        match path.materialize(graph, molecule, self.ctx.assembler(), make_3d) {
            Ok(()) => Ok(true),
            Err(Error::Collaborator(e)) => {
                warn!(path = %path, error = %e, "cannot build path model");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// Path atoms and their direct neighbors, attractors removed, with the
/// ring-closing bond added.
fn pruned_with_chord(
    path: &ChainPath,
    graph: &AssemblyGraph,
    molecule: &Molecule,
    is_core: &impl Fn(AtomIx) -> bool,
    (src_h, src_t): (AtomIx, AtomIx),
) -> Molecule {
    let mut keep: HashSet<AtomIx> = HashSet::new();
    for ix in molecule.graph().node_indices().filter(|ix| is_core(*ix)) {
        keep.insert(ix);
        for n in molecule.neighbors(ix) {
            if molecule.atom(n).is_some_and(|a| !a.is_attractor()) {
                keep.insert(n);
            }
        }
    }
    let (mut pruned, map) = molecule.induced(|ix| keep.contains(&ix));
    let order = path.chord_bond_type(graph).ok().and_then(|b| b.order());
    match (order, map[src_h.index()], map[src_t.index()]) {
        (Some(order), Some(h), Some(t)) => {
            pruned.add_chord(h, t, order);
        }
        _ => warn!(path = %path, "ring-closing bond has no chemical bond order"),
    }
    pruned
}
