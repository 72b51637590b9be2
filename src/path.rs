//! The unique spanning-tree path between two ring-closing vertices.

use std::{collections::HashSet, fmt::Display};

use nalgebra::Point3;
use tracing::trace;

use crate::{
    archive::RingClosingConformations,
    builder::{Assembler3D, PathModel},
    chain::{ChainLink, ClosableChain},
    error::{Error, Result},
    graph::{AssemblyGraph, BondType, BuildingBlock, EdgeIx, VertexIx},
    molecule::{AtomIx, BondIx, Molecule},
    ring::Ring,
};

/// Progress of the closability evaluation of a path.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ClosabilityState {
    #[default]
    NotEvaluated,
    Evaluating,
    Closed,
    Rejected,
}

/// Atom-level data of a path, from the head attractor to the tail attractor.
#[derive(Debug, Clone, PartialEq)]
pub struct PathGeometry {
    /// Coordinates from the path model.
    pub points: Vec<Point3<f64>>,
    /// The same atoms in the full molecule.
    pub atoms: Vec<AtomIx>,
    /// Bonds of the full molecule between consecutive atoms.
    pub bonds: Vec<BondIx>,
    pub rotatable: Vec<bool>,
    /// Reference points defining the torsion of every internal bond.
    pub dihedral_refs: Vec<[Point3<f64>; 4]>,
}

#[derive(Debug, Clone)]
pub struct ChainPath {
    head: VertexIx,
    tail: VertexIx,
    turning_point: VertexIx,
    vertices: Vec<VertexIx>,
    edges: Vec<EdgeIx>,
    chain: ClosableChain,
    chain_id: String,
    alternatives: Vec<String>,
    geometry: Option<PathGeometry>,
    conformations: Option<RingClosingConformations>,
    state: ClosabilityState,
}

impl ChainPath {
    /// Extract the path from `head` to `tail` through their closest common
    /// ancestor.
    pub fn build(head: VertexIx, tail: VertexIx, graph: &AssemblyGraph) -> Result<Self> {
        if head == tail {
            return Err(Error::structural(format!("path from {head:?} to itself")));
        }
        let up = graph.ancestry(head)?;
        let down = graph.ancestry(tail)?;
        let down_set: HashSet<VertexIx> = down.iter().copied().collect();

        let Some(ih) = up.iter().position(|v| down_set.contains(v)) else {
            return Err(Error::structural(format!(
                "vertices {head:?} and {tail:?} have no common ancestor"
            )));
        };
        let turning_point = up[ih];
        let it = down
            .iter()
            .position(|v| *v == turning_point)
            .ok_or_else(|| Error::structural("common ancestor lost"))?;

        let mut vertices: Vec<VertexIx> = up[..=ih].to_vec();
        vertices.extend(down[..it].iter().rev());

        let mut edges = Vec::with_capacity(vertices.len() - 1);
        for v in up[..ih].iter().chain(down[..it].iter().rev()) {
            let e = graph
                .edge_to_parent(*v)
                .ok_or_else(|| Error::structural(format!("vertex {v:?} has no parent edge")))?;
            edges.push(e);
        }

        // Encode the blocks strictly between the two ends.
        let mut links = Vec::with_capacity(vertices.len().saturating_sub(2));
        for i in 1..vertices.len() - 1 {
            let v = vertices[i];
            let vertex = graph
                .vertex(v)
                .ok_or_else(|| Error::structural(format!("unknown vertex {v:?}")))?;
            let (id, kind) = match *vertex.block() {
                BuildingBlock::Fragment { id, kind } => (id, kind),
                BuildingBlock::Composite { id, .. } => {
                    return Err(Error::structural(format!(
                        "ring path crosses composite building block {id} at vertex {v:?}"
                    )))
                }
            };
            let ap_left = ap_of(graph, edges[i - 1], v)?;
            let ap_right = ap_of(graph, edges[i], v)?;
            links.push(ChainLink::new(id, kind, ap_left, ap_right));
        }
        let tp_link = (ih > 0 && ih < vertices.len() - 1).then(|| ih - 1);
        let chain = ClosableChain::new(links, tp_link);
        let chain_id = chain.to_string();
        let alternatives = chain.alternative_ids();
        trace!(%chain_id, "built chain path");

        Ok(Self {
            head,
            tail,
            turning_point,
            vertices,
            edges,
            chain,
            chain_id,
            alternatives,
            geometry: None,
            conformations: None,
            state: ClosabilityState::NotEvaluated,
        })
    }

    pub fn head(&self) -> VertexIx {
        self.head
    }

    pub fn tail(&self) -> VertexIx {
        self.tail
    }

    pub fn turning_point(&self) -> VertexIx {
        self.turning_point
    }

    pub fn vertices(&self) -> &[VertexIx] {
        &self.vertices
    }

    pub fn edges(&self) -> &[EdgeIx] {
        &self.edges
    }

    pub fn chain(&self) -> &ClosableChain {
        &self.chain
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Equivalent chain ids, forward and reverse first.
    pub fn alternative_ids(&self) -> &[String] {
        &self.alternatives
    }

    pub fn geometry(&self) -> Option<&PathGeometry> {
        self.geometry.as_ref()
    }

    pub fn conformations(&self) -> Option<&RingClosingConformations> {
        self.conformations.as_ref()
    }

    pub fn set_conformations(&mut self, rcc: Option<RingClosingConformations>) {
        self.conformations = rcc;
    }

    pub fn state(&self) -> ClosabilityState {
        self.state
    }

    pub fn set_state(&mut self, state: ClosabilityState) {
        self.state = state;
    }

    pub fn shares_endpoint(&self, other: &ChainPath) -> bool {
        [self.head, self.tail].iter().any(|v| *v == other.head || *v == other.tail)
    }

    /// Rotatable bonds of the full molecule crossed by both paths. Empty
    /// unless both geometries are known.
    pub fn shared_rotatable_bonds(&self, other: &ChainPath) -> Vec<BondIx> {
        let (Some(a), Some(b)) = (&self.geometry, &other.geometry) else {
            return Vec::new();
        };
        a.bonds
            .iter()
            .zip(&a.rotatable)
            .filter(|(bond, rot)| **rot && b.bonds.contains(bond))
            .map(|(bond, _)| *bond)
            .collect()
    }

    /// Type of the chord: the bond type both ends have towards their
    /// parents.
    pub fn chord_bond_type(&self, graph: &AssemblyGraph) -> Result<BondType> {
        let bond_of = |v: VertexIx| {
            graph
                .edge_to_parent(v)
                .and_then(|e| graph.edge(e))
                .map(|e| e.bond)
                .ok_or_else(|| Error::structural(format!("vertex {v:?} has no parent edge")))
        };
        let (h, t) = (bond_of(self.head)?, bond_of(self.tail)?);
        if h != t {
            return Err(Error::structural(format!(
                "ring between {:?} and {:?} would join {h:?} and {t:?} bonds",
                self.head, self.tail
            )));
        }
        Ok(h)
    }

    pub fn to_ring(&self, graph: &AssemblyGraph) -> Result<Ring> {
        Ring::new(self.vertices.clone(), self.chord_bond_type(graph)?)
    }

    /// Build the atom-level geometry of this path.
    ///
    /// The atom path in the path model must have the same length as the one
    /// found in the full molecule; otherwise the ring runs through a cycle
    /// internal to some building block.
    pub fn materialize(
        &mut self,
        graph: &AssemblyGraph,
        molecule: &Molecule,
        assembler: &dyn Assembler3D,
        make_3d: bool,
    ) -> Result<()> {
        let model = assembler
            .assemble(graph, &self.vertices, molecule, make_3d)
            .map_err(Error::Collaborator)?;
        let local = attractor_path(&model.molecule, self.head, self.tail, |_| true)?;

        let full = attractor_path(molecule, self.head, self.tail, |_| true)?;
        if local.len() != full.len() {
            return Err(Error::GeometryInconsistency {
                head: self.head,
                tail: self.tail,
                local: local.len(),
                full: full.len(),
            });
        }

        let mut bonds = Vec::with_capacity(full.len() - 1);
        let mut rotatable = Vec::with_capacity(full.len() - 1);
        for w in full.windows(2) {
            let bond = molecule
                .bond_between(w[0], w[1])
                .ok_or_else(|| Error::structural("atom path is not bonded"))?;
            rotatable.push(molecule.bond(bond).is_some_and(|b| b.is_rotatable()));
            bonds.push(bond);
        }

        let points = local
            .iter()
            .map(|ix| model.molecule.atom(*ix).map(|a| a.position()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::structural("path model lost an atom"))?;
        let dihedral_refs = (1..local.len().saturating_sub(2))
            .map(|b| dihedral_reference(&model, &local, b))
            .collect::<Result<Vec<_>>>()?;

        self.geometry = Some(PathGeometry {
            points,
            atoms: full,
            bonds,
            rotatable,
            dihedral_refs,
        });
        Ok(())
    }
}

impl Display for ChainPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.vertices.iter().map(|v| v.index().to_string()).collect();
        write!(f, "{}", ids.join("-"))
    }
}

/// Attachment point `v` uses on edge `e`.
fn ap_of(graph: &AssemblyGraph, e: EdgeIx, v: VertexIx) -> Result<usize> {
    let (src, _) = graph
        .edge_endpoints(e)
        .ok_or_else(|| Error::structural(format!("unknown edge {e:?}")))?;
    let edge = graph
        .edge(e)
        .ok_or_else(|| Error::structural(format!("unknown edge {e:?}")))?;
    Ok(if src == v { edge.src_ap } else { edge.trg_ap })
}

fn attractor_path(
    molecule: &Molecule,
    head: VertexIx,
    tail: VertexIx,
    allowed: impl Fn(AtomIx) -> bool,
) -> Result<Vec<AtomIx>> {
    let find = |v: VertexIx| {
        molecule
            .attractor_of(v)
            .ok_or_else(|| Error::structural(format!("no ring-closing attractor on vertex {v:?}")))
    };
    let (from, to) = (find(head)?, find(tail)?);
    molecule.shortest_path(from, to, allowed).ok_or_else(|| {
        Error::structural(format!(
            "attractors of {head:?} and {tail:?} are not connected"
        ))
    })
}

/// Four points defining the torsion around bond `b` of `path`.
fn dihedral_reference(model: &PathModel, path: &[AtomIx], b: usize) -> Result<[Point3<f64>; 4]> {
    let mol = &model.molecule;
    let pos = |ix: AtomIx| {
        mol.atom(ix)
            .map(|a| a.position())
            .ok_or_else(|| Error::structural("path model lost an atom"))
    };
    let vertex = |ix: AtomIx| mol.atom(ix).map(|a| a.vertex());

    // Reference on `at`, looking away from `other` and preferring the
    // attachment point towards the previous block.
    let reference = |at: AtomIx, before: AtomIx, other: AtomIx| -> Result<Point3<f64>> {
        if vertex(before) != vertex(at) {
            if let Some(tip) = model.ap_tip_excluding(at, mol.bond_between(at, other)) {
                return Ok(tip);
            }
        }
        match mol.neighbors(at).into_iter().find(|n| *n != other) {
            Some(n) => pos(n),
            None => pos(before),
        }
    };

    let (a1, a2) = (path[b], path[b + 1]);
    Ok([
        reference(a1, path[b - 1], a2)?,
        pos(a1)?,
        pos(a2)?,
        reference(a2, path[b + 2], a1)?,
    ])
}
