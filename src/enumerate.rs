//! Choose which ring-closing vertices to join into rings.
//!
//! [`CombinationEnumerator::random_one`] draws a single combination guided by
//! the ring-size bias, [`CombinationEnumerator::all_combinations`] lists every
//! non-redundant maximal combination of closable chords.

use std::{collections::BTreeMap, time::Instant};

use bit_set::BitSet;
use clap::ValueEnum;
use rand::Rng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, trace};

use crate::{
    closability::ClosabilityEvaluator,
    compat::CompatGraph,
    context::RingClosureContext,
    error::{Error, Result},
    graph::{AssemblyGraph, VertexIx},
    interdependent::{
        check_closability_of_interdependent_paths, has_interdependent_paths, interdependency_map, PairKey,
    },
    molecule::Molecule,
    path::ChainPath,
    ring::{are_same_rings_set, Ring},
    size::RingSizeManager,
    state::MatchingState,
};

/// Whether candidate pairs are evaluated on the rayon thread pool.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum ParallelMode {
    /// Evaluate pairs one after the other.
    #[default]
    None,
    /// Evaluate pairs in parallel; the search over combinations stays
    /// sequential.
    Always,
}

pub struct CombinationEnumerator<'a> {
    ctx: &'a RingClosureContext,
    parallel: ParallelMode,
}

impl<'a> CombinationEnumerator<'a> {
    pub fn new(ctx: &'a RingClosureContext) -> Self {
        Self {
            ctx,
            parallel: ParallelMode::None,
        }
    }

    pub fn with_parallel_mode(mut self, parallel: ParallelMode) -> Self {
        self.parallel = parallel;
        self
    }

    /// Draw one combination of rings.
    ///
    /// Repeatedly picks a ring-closing vertex according to its bias weight,
    /// then tries its compatible partners in biased random order until one
    /// closes. Stops when no vertex is left or the maximum number of ring
    /// closures is reached.
    pub fn random_one<R: Rng + ?Sized>(
        &self,
        graph: &AssemblyGraph,
        molecule: &Molecule,
        rng: &mut R,
    ) -> Result<Vec<Ring>> {
        let params = self.ctx.params();
        let evaluator = ClosabilityEvaluator::new(self.ctx);
        let mut rsm = RingSizeManager::new(params, graph, molecule)?;
        let mut rings = Vec::new();

        while rings.len() < params.max_ring_closures {
            let Some(vi) = rsm.pick(None, rng) else {
                break;
            };

            let mut candidates = rsm.biased_candidates(Some(vi));
            let mut closed = false;
            while !candidates.is_empty() {
                let vj = candidates[rng.gen_range(0..candidates.len())];
                candidates.retain(|v| *v != vj);

                let mut path = ChainPath::build(vi, vj, graph)?;
                if !evaluator.is_closable(&mut path, graph, molecule)? {
                    continue;
                }
                let ring = path.to_ring(graph)?;
                debug!(path = %path, size = ?rsm.ring_size(vi, vj), "closing ring");
                rsm.commit_chord(vi, vj, ring.bond())?;
                rings.push(ring);
                closed = true;
                break;
            }
            if !closed {
                trace!(?vi, "no closable partner");
                rsm.mark_done(vi);
            }
        }
        Ok(rings)
    }

    /// Every maximal combination of simultaneously closable chords, without
    /// equivalent duplicates.
    pub fn all_combinations(&self, graph: &AssemblyGraph, molecule: &Molecule) -> Result<Vec<Vec<Ring>>> {
        let start = Instant::now();
        let params = self.ctx.params();
        let rsm = RingSizeManager::new(params, graph, molecule)?;
        let rcvs = rsm.ring_closing_vertices().to_vec();

        let paths = self.closable_paths(&rcvs, rsm.compat(), graph, molecule)?;
        let mut good = CompatGraph::new(rcvs.len());
        for (i, j) in paths.keys() {
            good.connect(*i, *j);
        }
        debug!(
            candidates = rsm.compat().pairs().len(),
            closable = paths.len(),
            "evaluated ring-closing pairs"
        );

        let interdependency = if params.check_interdependent_chains {
            interdependency_map(&paths)
        } else {
            BTreeMap::new()
        };

        let good_pairs = good.pairs();
        let all: BitSet = (0..rcvs.len()).collect();
        let mut results: Vec<Vec<Ring>> = Vec::new();
        let mut stack = vec![MatchingState::new(rcvs.len())];
        while let Some(state) = stack.pop() {
            let v = state.next();
            if v == rcvs.len() {
                if !is_maximal(&state, &good_pairs) || state.pairs().is_empty() {
                    continue;
                }
                let chosen = state.pairs();
                if !interdependency.is_empty()
                    && has_interdependent_paths(chosen, &interdependency)
                    && !check_closability_of_interdependent_paths(
                        chosen,
                        &interdependency,
                        &paths,
                        params.torsion_step,
                    )
                {
                    trace!(?chosen, "interdependent chords cannot close together");
                    continue;
                }

                let rings = chosen
                    .iter()
                    .map(|k| {
                        paths
                            .get(k)
                            .ok_or_else(|| Error::structural(format!("no path for pair {k:?}")))
                            .and_then(|p| p.to_ring(graph))
                    })
                    .collect::<Result<Vec<_>>>()?;
                if !results.iter().any(|r| are_same_rings_set(r, &rings)) {
                    results.push(rings);
                }
                continue;
            }

            // Siblings are pushed in reverse so that lower partners are
            // explored first; leaving `v` unpaired comes last.
            stack.push(state.skip());
            if !state.is_used(v) {
                let partners: Vec<usize> = good
                    .forward_neighbors(v, &all)
                    .iter()
                    .filter(|u| !state.is_used(*u))
                    .collect();
                for u in partners.into_iter().rev() {
                    stack.push(state.update(u));
                }
            }
        }

        info!(
            combinations = results.len(),
            elapsed = ?start.elapsed(),
            "enumerated ring combinations"
        );
        Ok(results)
    }

    fn closable_paths(
        &self,
        rcvs: &[VertexIx],
        compat: &CompatGraph,
        graph: &AssemblyGraph,
        molecule: &Molecule,
    ) -> Result<BTreeMap<PairKey, ChainPath>> {
        let evaluator = ClosabilityEvaluator::new(self.ctx);
        let evaluate = |(i, j): PairKey| -> Result<Option<(PairKey, ChainPath)>> {
            let mut path = ChainPath::build(rcvs[i], rcvs[j], graph)?;
            let closable = evaluator.is_closable(&mut path, graph, molecule)?;
            Ok(closable.then_some(((i, j), path)))
        };

        let pairs = compat.pairs();
        let evaluated: Vec<Option<(PairKey, ChainPath)>> = match self.parallel {
            ParallelMode::None => pairs.iter().copied().map(evaluate).collect::<Result<_>>()?,
            ParallelMode::Always => pairs.par_iter().copied().map(evaluate).collect::<Result<_>>()?,
        };
        Ok(evaluated.into_iter().flatten().collect())
    }
}

/// No closable pair is left with both ends unused.
fn is_maximal(state: &MatchingState, good_pairs: &[PairKey]) -> bool {
    good_pairs
        .iter()
        .all(|(a, b)| state.is_used(*a) || state.is_used(*b))
}
