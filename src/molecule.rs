//! Atom-level view of an assembled system.
//!
//! Every atom remembers the assembly-graph vertex it comes from and carries
//! Cartesian coordinates. Ring-closing attractors (RCAs) are pseudo-atoms that
//! stand for the atom a ring-closing vertex will eventually bond to.

use std::{collections::HashSet, fmt::Display, str::FromStr};

use nalgebra::Point3;
use petgraph::{
    graph::{EdgeIndex, Graph, NodeIndex},
    Undirected,
};

use crate::{
    graph::VertexIx,
    utils::{bfs_distances, bfs_path, sorted_neighbors},
};

pub(crate) type Index = u32;
pub(crate) type MGraph = Graph<Atom, Bond, Undirected, Index>;

pub type AtomIx = NodeIndex<Index>;
pub type BondIx = EdgeIndex<Index>;

/// Thrown by [`Element::from_str`] if the string does not represent a valid
/// chemical element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseElementError;

macro_rules! periodic_table {
    ( $(($element:ident, $name:literal),)* ) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        /// Represents a chemical element.
        pub enum Element {
            $( $element, )*
        }

        impl Display for Element {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match &self {
                    $( Element::$element => write!(f, "{}", $name), )*
                }
            }
        }

        impl FromStr for Element {
            type Err = ParseElementError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $name => Ok(Element::$element), )*
                    _ => Err(ParseElementError),
                }
            }
        }
    };
}

// Organic subset plus the metals that usually show up in coordination
// compounds.
periodic_table!(
    (Hydrogen, "H"),
    (Boron, "B"),
    (Carbon, "C"),
    (Nitrogen, "N"),
    (Oxygen, "O"),
    (Fluorine, "F"),
    (Sodium, "Na"),
    (Magnesium, "Mg"),
    (Aluminum, "Al"),
    (Silicon, "Si"),
    (Phosphorus, "P"),
    (Sulfur, "S"),
    (Chlorine, "Cl"),
    (Potassium, "K"),
    (Calcium, "Ca"),
    (Titanium, "Ti"),
    (Chromium, "Cr"),
    (Manganese, "Mn"),
    (Iron, "Fe"),
    (Cobalt, "Co"),
    (Nickel, "Ni"),
    (Copper, "Cu"),
    (Zinc, "Zn"),
    (Selenium, "Se"),
    (Bromine, "Br"),
    (Ruthenium, "Ru"),
    (Rhodium, "Rh"),
    (Palladium, "Pd"),
    (Silver, "Ag"),
    (Tin, "Sn"),
    (Iodine, "I"),
    (Iridium, "Ir"),
    (Platinum, "Pt"),
    (Gold, "Au"),
);

/// Family of a ring-closing attractor.
///
/// `Plus` pairs with `Minus`, `Neutral` pairs only with `Neutral`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttractorKind {
    Plus,
    Minus,
    Neutral,
}

impl AttractorKind {
    pub fn is_compatible(self, other: AttractorKind) -> bool {
        matches!(
            (self, other),
            (Self::Plus, Self::Minus) | (Self::Minus, Self::Plus) | (Self::Neutral, Self::Neutral)
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Plus => "ATP",
            Self::Minus => "ATM",
            Self::Neutral => "ATN",
        }
    }
}

impl FromStr for AttractorKind {
    type Err = ParseElementError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ATP" => Ok(Self::Plus),
            "ATM" => Ok(Self::Minus),
            "ATN" => Ok(Self::Neutral),
            _ => Err(ParseElementError),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AtomKind {
    Element(Element),
    Attractor(AttractorKind),
}

impl Display for AtomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Element(e) => write!(f, "{e}"),
            Self::Attractor(a) => write!(f, "{}", a.symbol()),
        }
    }
}

impl FromStr for AtomKind {
    type Err = ParseElementError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<AttractorKind>()
            .map(Self::Attractor)
            .or_else(|_| s.parse::<Element>().map(Self::Element))
    }
}

/// The nodes of a [`Molecule`] graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    kind: AtomKind,
    vertex: VertexIx,
    position: Point3<f64>,
}

impl Atom {
    pub fn new(kind: AtomKind, vertex: VertexIx, position: Point3<f64>) -> Self {
        Self {
            kind,
            vertex,
            position,
        }
    }

    pub fn kind(&self) -> AtomKind {
        self.kind
    }

    /// Assembly-graph vertex this atom belongs to.
    pub fn vertex(&self) -> VertexIx {
        self.vertex
    }

    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    pub fn is_attractor(&self) -> bool {
        matches!(self.kind, AtomKind::Attractor(_))
    }

    pub fn attractor(&self) -> Option<AttractorKind> {
        match self.kind {
            AtomKind::Attractor(a) => Some(a),
            AtomKind::Element(_) => None,
        }
    }

    /// Element symbol, or the attractor pseudo-symbol.
    pub fn symbol(&self) -> String {
        self.kind.to_string()
    }
}

/// Bond order of a real bond.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
}

/// Thrown by [`BondOrder::try_from`] when given anything other than a 1, 2,
/// or 3.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseBondError;

impl TryFrom<usize> for BondOrder {
    type Error = ParseBondError;
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(BondOrder::Single),
            2 => Ok(BondOrder::Double),
            3 => Ok(BondOrder::Triple),
            _ => Err(ParseBondError),
        }
    }
}

/// The edges of a [`Molecule`] graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Bond {
    order: BondOrder,
    rotatable: bool,
}

impl Bond {
    pub fn new(order: BondOrder, rotatable: bool) -> Self {
        Self { order, rotatable }
    }

    pub fn order(&self) -> BondOrder {
        self.order
    }

    /// Whether torsions around this bond may be explored.
    pub fn is_rotatable(&self) -> bool {
        self.rotatable
    }
}

/// A loopless graph of [`Atom`]s and [`Bond`]s with 3D coordinates.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    graph: MGraph,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn graph(&self) -> &MGraph {
        &self.graph
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn add_atom(&mut self, atom: Atom) -> AtomIx {
        self.graph.add_node(atom)
    }

    pub fn add_bond(&mut self, a: AtomIx, b: AtomIx, bond: Bond) -> BondIx {
        self.graph.add_edge(a, b, bond)
    }

    pub fn atom(&self, ix: AtomIx) -> Option<&Atom> {
        self.graph.node_weight(ix)
    }

    pub fn bond(&self, ix: BondIx) -> Option<&Bond> {
        self.graph.edge_weight(ix)
    }

    pub fn bond_between(&self, a: AtomIx, b: AtomIx) -> Option<BondIx> {
        self.graph.find_edge(a, b)
    }

    pub fn neighbors(&self, a: AtomIx) -> Vec<AtomIx> {
        sorted_neighbors(&self.graph, a)
    }

    /// Return `true` iff this molecule contains self-loops or multiple edges
    /// between any pair of nodes.
    pub fn is_malformed(&self) -> bool {
        let mut uniq = HashSet::new();
        !self.graph.edge_indices().all(|ix| {
            self.graph.edge_endpoints(ix).is_some_and(|(src, dst)| {
                src != dst && uniq.insert((src.min(dst), src.max(dst)))
            })
        })
    }

    /// Atoms contributed by `vertex`, in index order.
    pub fn atoms_of_vertex(&self, vertex: VertexIx) -> Vec<AtomIx> {
        self.graph
            .node_indices()
            .filter(|&ix| self.graph[ix].vertex == vertex)
            .collect()
    }

    /// The ring-closing attractor contributed by `vertex`, if any.
    pub fn attractor_of(&self, vertex: VertexIx) -> Option<AtomIx> {
        self.graph
            .node_indices()
            .find(|&ix| self.graph[ix].vertex == vertex && self.graph[ix].is_attractor())
    }

    /// The atom an attractor is bonded to, i.e., the atom that will take part
    /// in the ring-closing bond.
    pub fn source_of(&self, attractor: AtomIx) -> Option<AtomIx> {
        self.neighbors(attractor).into_iter().next()
    }

    /// Topological distance from `source` to every atom.
    pub fn distances_from(&self, source: AtomIx) -> Vec<Option<usize>> {
        bfs_distances(&self.graph, source)
    }

    /// Shortest atom path from `from` to `to` over atoms accepted by
    /// `allowed`.
    pub fn shortest_path(
        &self,
        from: AtomIx,
        to: AtomIx,
        allowed: impl Fn(AtomIx) -> bool,
    ) -> Option<Vec<AtomIx>> {
        bfs_path(&self.graph, from, to, allowed)
    }

    /// Add a ring-closing bond. Chords never rotate.
    pub fn add_chord(&mut self, a: AtomIx, b: AtomIx, order: BondOrder) -> BondIx {
        self.graph.add_edge(a, b, Bond::new(order, false))
    }

    /// Copy of the subgraph induced by `keep`, together with the map from
    /// atoms of this molecule to atoms of the copy.
    pub fn induced(&self, keep: impl Fn(AtomIx) -> bool) -> (Molecule, Vec<Option<AtomIx>>) {
        let mut sub = Molecule::new();
        let mut map = vec![None; self.graph.node_count()];
        for ix in self.graph.node_indices().filter(|&ix| keep(ix)) {
            map[ix.index()] = Some(sub.add_atom(self.graph[ix].clone()));
        }
        for e in self.graph.edge_indices() {
            let Some((a, b)) = self.graph.edge_endpoints(e) else {
                continue;
            };
            if let (Some(ma), Some(mb)) = (map[a.index()], map[b.index()]) {
                sub.add_bond(ma, mb, self.graph[e]);
            }
        }
        (sub, map)
    }
}
