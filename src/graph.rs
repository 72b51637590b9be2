//! Assembly graphs: building blocks joined through attachment points.
//!
//! The spanning tree of an assembly graph is directed from parent to child;
//! every vertex except the root has exactly one incoming edge. Rings are
//! recorded separately as lists of vertices from head to tail.

use std::{collections::HashSet, fmt::Display, str::FromStr};

use petgraph::{
    graph::{EdgeIndex, Graph, NodeIndex},
    visit::EdgeRef,
    Directed, Direction,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    molecule::{BondOrder, Index},
    ring::Ring,
};

pub type VertexIx = NodeIndex<Index>;
pub type EdgeIx = EdgeIndex<Index>;
pub(crate) type AGraph = Graph<Vertex, Edge, Directed, Index>;

/// Bond type carried by an assembly-graph edge and by ring-closing chords.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BondType {
    Single,
    Double,
    Triple,
    Undefined,
}

impl BondType {
    /// Bond order of the real bond this type stands for, if any.
    pub fn order(self) -> Option<BondOrder> {
        match self {
            Self::Single => Some(BondOrder::Single),
            Self::Double => Some(BondOrder::Double),
            Self::Triple => Some(BondOrder::Triple),
            Self::Undefined => None,
        }
    }
}

/// Role of a building block in the assembled system.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BBType {
    Scaffold,
    Fragment,
    Cap,
    Undefined,
}

/// Thrown by [`BBType::from_str`] for unknown building-block types.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseBBTypeError;

impl Display for BBType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Scaffold => "SCAFFOLD",
            Self::Fragment => "FRAGMENT",
            Self::Cap => "CAP",
            Self::Undefined => "UNDEFINED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for BBType {
    type Err = ParseBBTypeError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "SCAFFOLD" => Ok(Self::Scaffold),
            "FRAGMENT" => Ok(Self::Fragment),
            "CAP" => Ok(Self::Cap),
            "UNDEFINED" => Ok(Self::Undefined),
            _ => Err(ParseBBTypeError),
        }
    }
}

/// What a vertex is made of.
///
/// Only simple fragments can be walked through by ring-closing paths;
/// composite assemblies are nested graphs and are rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BuildingBlock {
    Fragment { id: usize, kind: BBType },
    Composite { id: usize, kind: BBType },
}

impl BuildingBlock {
    pub fn id(&self) -> usize {
        match *self {
            Self::Fragment { id, .. } | Self::Composite { id, .. } => id,
        }
    }

    pub fn kind(&self) -> BBType {
        match *self {
            Self::Fragment { kind, .. } | Self::Composite { kind, .. } => kind,
        }
    }
}

/// An attachment point: the atom it sits on (position within the building
/// block) and its optional class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentPoint {
    pub atom: usize,
    pub class: Option<String>,
}

impl AttachmentPoint {
    pub fn new(atom: usize, class: Option<&str>) -> Self {
        Self {
            atom,
            class: class.map(str::to_owned),
        }
    }
}

/// The nodes of an [`AssemblyGraph`].
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    block: BuildingBlock,
    aps: Vec<AttachmentPoint>,
    rcv: bool,
}

impl Vertex {
    pub fn new(block: BuildingBlock, aps: Vec<AttachmentPoint>) -> Self {
        Self {
            block,
            aps,
            rcv: false,
        }
    }

    /// A ring-closing vertex: a capping block holding one attractor.
    pub fn ring_closing(id: usize, ap: AttachmentPoint) -> Self {
        Self {
            block: BuildingBlock::Fragment {
                id,
                kind: BBType::Cap,
            },
            aps: vec![ap],
            rcv: true,
        }
    }

    /// The same vertex, flagged as ring-closing.
    pub fn into_ring_closing(mut self) -> Self {
        self.rcv = true;
        self
    }

    pub fn block(&self) -> &BuildingBlock {
        &self.block
    }

    pub fn attachment_points(&self) -> &[AttachmentPoint] {
        &self.aps
    }

    pub fn attachment_point(&self, ix: usize) -> Option<&AttachmentPoint> {
        self.aps.get(ix)
    }

    pub fn is_ring_closing(&self) -> bool {
        self.rcv
    }
}

/// The edges of an [`AssemblyGraph`], directed from parent to child.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub src_ap: usize,
    pub trg_ap: usize,
    pub bond: BondType,
}

/// A spanning tree of building blocks plus the rings closed on top of it.
#[derive(Debug, Clone, Default)]
pub struct AssemblyGraph {
    graph: AGraph,
    rings: Vec<Ring>,
}

impl AssemblyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn graph(&self) -> &AGraph {
        &self.graph
    }

    pub fn add_vertex(&mut self, vertex: Vertex) -> VertexIx {
        self.graph.add_node(vertex)
    }

    /// Attach `child` below `parent`.
    pub fn connect(
        &mut self,
        parent: VertexIx,
        parent_ap: usize,
        child: VertexIx,
        child_ap: usize,
        bond: BondType,
    ) -> Result<EdgeIx> {
        if self.graph.node_weight(parent).is_none() || self.graph.node_weight(child).is_none() {
            return Err(Error::structural(format!(
                "cannot connect unknown vertices {parent:?} and {child:?}"
            )));
        }
        if self.edge_to_parent(child).is_some() {
            return Err(Error::structural(format!(
                "vertex {child:?} already has a parent"
            )));
        }
        Ok(self.graph.add_edge(
            parent,
            child,
            Edge {
                src_ap: parent_ap,
                trg_ap: child_ap,
                bond,
            },
        ))
    }

    pub fn vertex(&self, v: VertexIx) -> Option<&Vertex> {
        self.graph.node_weight(v)
    }

    pub fn edge(&self, e: EdgeIx) -> Option<&Edge> {
        self.graph.edge_weight(e)
    }

    pub fn edge_endpoints(&self, e: EdgeIx) -> Option<(VertexIx, VertexIx)> {
        self.graph.edge_endpoints(e)
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VertexIx> + '_ {
        self.graph.node_indices()
    }

    pub fn edge_to_parent(&self, v: VertexIx) -> Option<EdgeIx> {
        self.graph
            .edges_directed(v, Direction::Incoming)
            .next()
            .map(|e| e.id())
    }

    pub fn parent(&self, v: VertexIx) -> Option<VertexIx> {
        self.graph.neighbors_directed(v, Direction::Incoming).next()
    }

    /// Children of `v`, in index order.
    pub fn children(&self, v: VertexIx) -> Vec<VertexIx> {
        let mut kids: Vec<_> = self.graph.neighbors_directed(v, Direction::Outgoing).collect();
        kids.sort();
        kids
    }

    /// `v` followed by its ancestors up to the root.
    pub fn ancestry(&self, v: VertexIx) -> Result<Vec<VertexIx>> {
        let mut seen = HashSet::new();
        let mut line = Vec::new();
        let mut cur = Some(v);
        while let Some(u) = cur {
            if !seen.insert(u) {
                return Err(Error::structural(format!(
                    "parent relation of vertex {v:?} loops through {u:?}"
                )));
            }
            line.push(u);
            cur = self.parent(u);
        }
        Ok(line)
    }

    /// Depth of `v` in the spanning tree; the root is at level 0.
    pub fn level(&self, v: VertexIx) -> Result<usize> {
        Ok(self.ancestry(v)?.len() - 1)
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn ring_of(&self, v: VertexIx) -> Option<&Ring> {
        self.rings.iter().find(|r| r.contains(v))
    }

    pub fn is_in_ring(&self, v: VertexIx) -> bool {
        self.ring_of(v).is_some()
    }

    /// Ring-closing vertices not used by any ring yet, in index order.
    pub fn free_ring_closing_vertices(&self) -> Vec<VertexIx> {
        self.graph
            .node_indices()
            .filter(|&v| self.graph[v].rcv && !self.rings.iter().any(|r| r.has_end(v)))
            .collect()
    }

    /// Record a ring. Its ends must be free ring-closing vertices whose bonds
    /// to their parents have the same type as the ring.
    pub fn add_ring(&mut self, ring: Ring) -> Result<()> {
        for end in [ring.head(), ring.tail()] {
            let is_rcv = self.vertex(end).is_some_and(Vertex::is_ring_closing);
            if !is_rcv {
                return Err(Error::structural(format!(
                    "ring end {end:?} is not a ring-closing vertex"
                )));
            }
            if self.rings.iter().any(|r| r.has_end(end)) {
                return Err(Error::structural(format!(
                    "ring-closing vertex {end:?} is already used by a ring"
                )));
            }
            let bond = self
                .edge_to_parent(end)
                .and_then(|e| self.edge(e))
                .map(|e| e.bond);
            if bond != Some(ring.bond()) {
                return Err(Error::structural(format!(
                    "ring bond {:?} does not match bond {bond:?} of vertex {end:?}",
                    ring.bond()
                )));
            }
        }
        self.rings.push(ring);
        Ok(())
    }

    pub fn clear_rings(&mut self) {
        self.rings.clear();
    }
}
