//! Ring-size bookkeeping for the ring-closing vertices of one graph.
//!
//! Works on a private copy of the molecule so that chords added while
//! building a random combination shorten the topological distances seen by
//! the following choices.

use rand::Rng;
use tracing::{debug, trace};

use crate::{
    compat::CompatGraph,
    config::RingClosureParameters,
    error::{Error, Result},
    graph::{AssemblyGraph, BondType, VertexIx},
    molecule::{AtomIx, Molecule},
};

pub struct RingSizeManager<'a> {
    params: &'a RingClosureParameters,
    graph: &'a AssemblyGraph,
    molecule: Molecule,
    rcvs: Vec<VertexIx>,
    attractors: Vec<AtomIx>,
    /// Topological distance between the attractors of two positions.
    distances: Vec<Vec<Option<usize>>>,
    compat: CompatGraph,
    weights: Vec<u32>,
    done: Vec<bool>,
}

impl<'a> RingSizeManager<'a> {
    /// Collect the free ring-closing vertices of `graph` and compute their
    /// pairwise compatibility and bias weights.
    pub fn new(
        params: &'a RingClosureParameters,
        graph: &'a AssemblyGraph,
        molecule: &Molecule,
    ) -> Result<Self> {
        let mut rcvs = Vec::new();
        let mut attractors = Vec::new();
        for v in graph.free_ring_closing_vertices() {
            let rca = molecule.attractor_of(v).ok_or_else(|| {
                Error::structural(format!("ring-closing vertex {v:?} has no attractor atom"))
            })?;
            // Attractors on an isolated scaffold cannot close anything.
            if molecule.neighbors(rca).is_empty() {
                trace!(?v, "skipping unbonded attractor");
                continue;
            }
            rcvs.push(v);
            attractors.push(rca);
        }

        let n = rcvs.len();
        let mut rsm = Self {
            params,
            graph,
            molecule: molecule.clone(),
            rcvs,
            attractors,
            distances: vec![vec![None; n]; n],
            compat: CompatGraph::new(n),
            weights: vec![0; n],
            done: vec![false; n],
        };
        rsm.refresh()?;
        Ok(rsm)
    }

    /// Recompute distances, compatibility and weights from the working
    /// molecule.
    fn refresh(&mut self) -> Result<()> {
        let n = self.rcvs.len();
        for i in 0..n {
            let dist = self.molecule.distances_from(self.attractors[i]);
            for j in 0..n {
                self.distances[i][j] = dist[self.attractors[j].index()];
            }
        }

        self.compat = CompatGraph::new(n);
        for i in 0..n {
            for j in i + 1..n {
                if !self.done[i] && !self.done[j] && self.evaluate_pair(i, j)? {
                    self.compat.connect(i, j);
                }
            }
        }

        self.reweigh();
        debug!(rcvs = n, weights = ?self.weights, "ring size bias updated");
        Ok(())
    }

    /// Weight of each vertex: the summed bias of the rings it may still close.
    fn reweigh(&mut self) {
        for i in 0..self.rcvs.len() {
            self.weights[i] = if self.done[i] {
                0
            } else {
                self.compat
                    .compatible_with(i)
                    .iter()
                    .filter_map(|j| self.size_at(i, j))
                    .map(|size| self.params.bias_for(size))
                    .sum()
            };
        }
    }

    /// Ring size of the chord between positions `i` and `j`: the number of
    /// atoms strictly between the two attractors.
    fn size_at(&self, i: usize, j: usize) -> Option<usize> {
        self.distances[i][j].map(|d| d.saturating_sub(1))
    }

    fn evaluate_pair(&self, i: usize, j: usize) -> Result<bool> {
        let (vi, vj) = (self.rcvs[i], self.rcvs[j]);
        if vi == vj {
            return Ok(false);
        }

        // Attractor families must match.
        let kind = |ix: AtomIx| self.molecule.atom(ix).and_then(|a| a.attractor());
        match (kind(self.attractors[i]), kind(self.attractors[j])) {
            (Some(a), Some(b)) if a.is_compatible(b) => (),
            _ => return Ok(false),
        }

        let parent_ap = |v: VertexIx| -> Result<(VertexIx, usize, BondType)> {
            let e = self
                .graph
                .edge_to_parent(v)
                .ok_or_else(|| Error::structural(format!("ring-closing vertex {v:?} has no parent")))?;
            let (src, _) = self
                .graph
                .edge_endpoints(e)
                .ok_or_else(|| Error::structural("dangling edge"))?;
            let edge = self.graph.edge(e).ok_or_else(|| Error::structural("dangling edge"))?;
            Ok((src, edge.src_ap, edge.bond))
        };
        let (pi, ap_i, _) = parent_ap(vi)?;
        let (pj, ap_j, _) = parent_ap(vj)?;

        let class = |p: VertexIx, ap: usize| {
            self.graph
                .vertex(p)
                .and_then(|v| v.attachment_point(ap))
                .and_then(|ap| ap.class.as_deref())
        };
        if !self
            .params
            .classes_compatible(class(pi, ap_i), class(pj, ap_j))
        {
            return Ok(false);
        }

        // Two attachment points on the same atom of the same parent.
        if pi == pj {
            let atom_of = |ap: usize| self.graph.vertex(pi).and_then(|v| v.attachment_point(ap)).map(|ap| ap.atom);
            if atom_of(ap_i) == atom_of(ap_j) {
                return Ok(false);
            }
        }

        let Some(size) = self.size_at(i, j) else {
            return Ok(false);
        };
        let ok = size <= self.params.max_ring_size && self.params.bias_for(size) > 0;
        trace!(?vi, ?vj, size, ok, "ring size check");
        Ok(ok)
    }

    fn position(&self, v: VertexIx) -> Option<usize> {
        self.rcvs.iter().position(|r| *r == v)
    }

    /// Free ring-closing vertices tracked by this manager.
    pub fn ring_closing_vertices(&self) -> &[VertexIx] {
        &self.rcvs
    }

    pub fn is_compatible(&self, vi: VertexIx, vj: VertexIx) -> bool {
        match (self.position(vi), self.position(vj)) {
            (Some(i), Some(j)) => self.compat.are_adjacent(i, j),
            _ => false,
        }
    }

    /// Number of atoms of the ring that a chord between `vi` and `vj` would
    /// close.
    pub fn ring_size(&self, vi: VertexIx, vj: VertexIx) -> Option<usize> {
        self.size_at(self.position(vi)?, self.position(vj)?)
    }

    pub fn weight(&self, v: VertexIx) -> u32 {
        self.position(v).map_or(0, |i| self.weights[i])
    }

    pub fn compat(&self) -> &CompatGraph {
        &self.compat
    }

    /// Candidate vertices, each repeated as many times as its weight: all
    /// vertices still open when `anchor` is `None`, otherwise those
    /// compatible with `anchor`, weighted by the bias of the ring they would
    /// close with it.
    pub fn biased_candidates(&self, anchor: Option<VertexIx>) -> Vec<VertexIx> {
        let mut out = Vec::new();
        match anchor.and_then(|a| self.position(a)) {
            None if anchor.is_some() => (),
            None => {
                for (i, v) in self.rcvs.iter().enumerate() {
                    if !self.done[i] {
                        out.extend(std::iter::repeat(*v).take(self.weights[i] as usize));
                    }
                }
            }
            Some(a) => {
                for j in self.compat.compatible_with(a).iter() {
                    if self.done[j] {
                        continue;
                    }
                    let w = self.size_at(a, j).map_or(0, |s| self.params.bias_for(s));
                    out.extend(std::iter::repeat(self.rcvs[j]).take(w as usize));
                }
            }
        }
        out
    }

    /// Draw one vertex from `biased_candidates(anchor)`.
    pub fn pick<R: Rng + ?Sized>(&self, anchor: Option<VertexIx>, rng: &mut R) -> Option<VertexIx> {
        let pool = self.biased_candidates(anchor);
        if pool.is_empty() {
            return None;
        }
        Some(pool[rng.gen_range(0..pool.len())])
    }

    /// Bond the source atoms of `vi` and `vj` in the working molecule and
    /// update everything that depends on distances.
    pub fn commit_chord(&mut self, vi: VertexIx, vj: VertexIx, bond: BondType) -> Result<()> {
        let (Some(i), Some(j)) = (self.position(vi), self.position(vj)) else {
            return Err(Error::structural(format!(
                "chord between untracked vertices {vi:?} and {vj:?}"
            )));
        };
        let src = |ix: AtomIx| {
            self.molecule
                .source_of(ix)
                .ok_or_else(|| Error::structural("attractor without source atom"))
        };
        let (si, sj) = (src(self.attractors[i])?, src(self.attractors[j])?);
        if let Some(order) = bond.order() {
            self.molecule.add_chord(si, sj, order);
        }
        self.done[i] = true;
        self.done[j] = true;
        self.refresh()
    }

    /// Exclude `v` from further candidate lists.
    pub fn mark_done(&mut self, v: VertexIx) {
        if let Some(i) = self.position(v) {
            self.done[i] = true;
            self.compat.isolate(i);
            self.reweigh();
        }
    }
}
