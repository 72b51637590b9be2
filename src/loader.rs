//! JSON input: an assembly graph together with its 3D molecular
//! representation.
//!
//! ```json
//! {
//!   "vertices": [{"block": {"kind": "fragment", "id": 3, "bb_type": "SCAFFOLD"},
//!                 "aps": [{"atom": 0, "class": "c:0"}], "rcv": false}],
//!   "edges": [{"parent": 0, "parent_ap": 0, "child": 1, "child_ap": 0, "bond": "single"}],
//!   "atoms": [{"symbol": "C", "vertex": 0, "position": [0.0, 0.0, 0.0]}],
//!   "bonds": [{"atoms": [0, 1], "order": 1, "rotatable": true}]
//! }
//! ```

use std::{fs, path::Path};

use nalgebra::Point3;
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    graph::{AssemblyGraph, AttachmentPoint, BBType, BondType, BuildingBlock, Vertex, VertexIx},
    molecule::{Atom, AtomIx, AtomKind, Bond, BondOrder, Molecule},
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SystemRecord {
    vertices: Vec<VertexRecord>,
    #[serde(default)]
    edges: Vec<EdgeRecord>,
    #[serde(default)]
    atoms: Vec<AtomRecord>,
    #[serde(default)]
    bonds: Vec<BondRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum BlockRecord {
    Fragment { id: usize, bb_type: BBType },
    Composite { id: usize, bb_type: BBType },
}

#[derive(Debug, Deserialize)]
struct ApRecord {
    atom: usize,
    #[serde(default)]
    class: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VertexRecord {
    block: BlockRecord,
    #[serde(default)]
    aps: Vec<ApRecord>,
    #[serde(default)]
    rcv: bool,
}

#[derive(Debug, Deserialize)]
struct EdgeRecord {
    parent: usize,
    parent_ap: usize,
    child: usize,
    child_ap: usize,
    bond: BondType,
}

#[derive(Debug, Deserialize)]
struct AtomRecord {
    symbol: String,
    vertex: usize,
    position: [f64; 3],
}

fn rotatable_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct BondRecord {
    atoms: [usize; 2],
    order: usize,
    #[serde(default = "rotatable_by_default")]
    rotatable: bool,
}

pub fn parse(p: &Path) -> Result<(AssemblyGraph, Molecule)> {
    parse_str(&fs::read_to_string(p)?)
}

pub fn parse_str(text: &str) -> Result<(AssemblyGraph, Molecule)> {
    let record: SystemRecord = serde_json::from_str(text)?;

    let mut graph = AssemblyGraph::new();
    for v in record.vertices {
        let block = match v.block {
            BlockRecord::Fragment { id, bb_type } => BuildingBlock::Fragment { id, kind: bb_type },
            BlockRecord::Composite { id, bb_type } => BuildingBlock::Composite { id, kind: bb_type },
        };
        let aps = v
            .aps
            .into_iter()
            .map(|ap| AttachmentPoint {
                atom: ap.atom,
                class: ap.class,
            })
            .collect();
        let vertex = Vertex::new(block, aps);
        graph.add_vertex(if v.rcv { vertex.into_ring_closing() } else { vertex });
    }

    let n = graph.vertex_count();
    let vertex_ix = |i: usize| {
        if i < n {
            Ok(VertexIx::new(i))
        } else {
            Err(Error::structural(format!("vertex {i} out of range")))
        }
    };
    for e in record.edges {
        graph.connect(vertex_ix(e.parent)?, e.parent_ap, vertex_ix(e.child)?, e.child_ap, e.bond)?;
    }

    let mut molecule = Molecule::new();
    for a in record.atoms {
        let kind: AtomKind = a
            .symbol
            .parse()
            .map_err(|_| Error::structural(format!("unknown atom symbol {:?}", a.symbol)))?;
        let [x, y, z] = a.position;
        molecule.add_atom(Atom::new(kind, vertex_ix(a.vertex)?, Point3::new(x, y, z)));
    }

    let atom_count = molecule.atom_count();
    for b in record.bonds {
        let [i, j] = b.atoms;
        if i >= atom_count || j >= atom_count {
            return Err(Error::structural(format!("bond {i}-{j} refers to unknown atoms")));
        }
        let order = BondOrder::try_from(b.order)
            .map_err(|_| Error::structural(format!("unsupported bond order {}", b.order)))?;
        molecule.add_bond(AtomIx::new(i), AtomIx::new(j), Bond::new(order, b.rotatable));
    }
    if molecule.is_malformed() {
        return Err(Error::structural("molecule has self-loops or repeated bonds"));
    }

    Ok((graph, molecule))
}
