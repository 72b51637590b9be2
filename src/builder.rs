//! Three-dimensional models of the building blocks along a path.

use std::collections::HashMap;

use anyhow::{anyhow, bail};
use nalgebra::Point3;

use crate::{
    graph::{AssemblyGraph, VertexIx},
    molecule::{AtomIx, BondIx, Molecule},
};

/// Direction of an attachment point in a path model: the atom it sits on and
/// the position of the atom it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct ApVector {
    pub atom: AtomIx,
    pub tip: Point3<f64>,
    /// Bond of the model used by this attachment point, if the atom at the
    /// tip is part of the model.
    pub bond: Option<BondIx>,
}

/// Molecular model of a path: the atoms of the path's vertices with
/// coordinates, plus the attachment points leaving each vertex.
#[derive(Debug, Clone)]
pub struct PathModel {
    pub molecule: Molecule,
    pub attachment_points: Vec<ApVector>,
}

impl PathModel {
    /// Tip of the first attachment point on `atom` that does not use `bond`.
    pub fn ap_tip_excluding(&self, atom: AtomIx, bond: Option<BondIx>) -> Option<Point3<f64>> {
        self.attachment_points
            .iter()
            .find(|ap| ap.atom == atom && (bond.is_none() || ap.bond != bond))
            .map(|ap| ap.tip)
    }
}

/// Builds the molecular model of the vertices of a path, in path order.
pub trait Assembler3D: Send + Sync {
    fn assemble(
        &self,
        graph: &AssemblyGraph,
        path: &[VertexIx],
        molecule: &Molecule,
        make_3d: bool,
    ) -> anyhow::Result<PathModel>;
}

/// Carves the path model out of a molecule that already has coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceAssembler;

impl Assembler3D for SliceAssembler {
    fn assemble(
        &self,
        graph: &AssemblyGraph,
        path: &[VertexIx],
        molecule: &Molecule,
        _make_3d: bool,
    ) -> anyhow::Result<PathModel> {
        let order: HashMap<VertexIx, usize> = path.iter().enumerate().map(|(i, v)| (*v, i)).collect();
        if let Some(v) = path.iter().find(|v| graph.vertex(**v).is_none()) {
            bail!("vertex {v:?} is not part of the assembly graph");
        }

        let mut atoms: Vec<AtomIx> = molecule
            .graph()
            .node_indices()
            .filter(|ix| order.contains_key(&molecule.graph()[*ix].vertex()))
            .collect();
        if atoms.is_empty() {
            bail!("no atoms belong to the path vertices");
        }
        atoms.sort_by_key(|ix| (order[&molecule.graph()[*ix].vertex()], *ix));

        let mut model = Molecule::new();
        let mut map: HashMap<AtomIx, AtomIx> = HashMap::new();
        for ix in &atoms {
            let atom = molecule
                .atom(*ix)
                .ok_or_else(|| anyhow!("atom {ix:?} vanished"))?
                .clone();
            map.insert(*ix, model.add_atom(atom));
        }
        for e in molecule.graph().edge_indices() {
            let Some((a, b)) = molecule.graph().edge_endpoints(e) else {
                continue;
            };
            if let (Some(ma), Some(mb)) = (map.get(&a), map.get(&b)) {
                model.add_bond(*ma, *mb, molecule.graph()[e]);
            }
        }

        let mut attachment_points = Vec::new();
        for ix in &atoms {
            let vertex = molecule.graph()[*ix].vertex();
            for nbr in molecule.neighbors(*ix) {
                let other = &molecule.graph()[nbr];
                if other.vertex() == vertex {
                    continue;
                }
                let here = map[ix];
                attachment_points.push(ApVector {
                    atom: here,
                    tip: other.position(),
                    bond: map.get(&nbr).and_then(|m| model.bond_between(here, *m)),
                });
            }
        }

        Ok(PathModel {
            molecule: model,
            attachment_points,
        })
    }
}
