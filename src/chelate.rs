//! Denticity rules for coordination compounds built around a metal root.

use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    config::RingClosureParameters,
    error::{Error, Result},
    graph::{AssemblyGraph, BBType, VertexIx},
};

/// Check the rings currently applied to `graph` against the chelate rules.
///
/// Ligands bound to the root through a metal-coordinating attachment point
/// must use all their ring-closing vertices, and deeper vertices must use all
/// ring-closing vertices of each attachment-point class they carry.
pub fn check_chelates(graph: &AssemblyGraph, params: &RingClosureParameters) -> Result<bool> {
    for v in graph.vertices() {
        let vertex = graph
            .vertex(v)
            .ok_or_else(|| Error::structural(format!("unknown vertex {v:?}")))?;
        let level = graph.level(v)?;
        let rcv_children: Vec<VertexIx> = graph
            .children(v)
            .into_iter()
            .filter(|c| graph.vertex(*c).is_some_and(|cv| cv.is_ring_closing()))
            .collect();

        if level == 1 && vertex.block().kind() == BBType::Fragment {
            let class = graph
                .edge_to_parent(v)
                .and_then(|e| graph.edge(e))
                .and_then(|e| vertex.attachment_point(e.trg_ap))
                .and_then(|ap| ap.class.as_deref());
            if !params.is_metal_coordinating(class) {
                continue;
            }
            if let Some(orphan) = rcv_children.iter().find(|c| !graph.is_in_ring(**c)) {
                debug!(ligand = ?v, ?orphan, "orphan coordinating site");
                return Ok(false);
            }
        }

        if level > 1 {
            let mut by_class: BTreeMap<Option<&str>, (usize, usize)> = BTreeMap::new();
            for c in &rcv_children {
                let class = graph
                    .vertex(*c)
                    .and_then(|cv| cv.attachment_point(0))
                    .and_then(|ap| ap.class.as_deref());
                let entry = by_class.entry(class).or_default();
                entry.0 += 1;
                if graph.is_in_ring(*c) {
                    entry.1 += 1;
                }
            }
            if let Some((class, _)) = by_class.iter().find(|(_, (total, used))| used < total) {
                debug!(vertex = ?v, ?class, "denticity not fully used");
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{AttachmentPoint, BondType, BuildingBlock, Vertex},
        ring::Ring,
    };

    fn params() -> RingClosureParameters {
        RingClosureParameters {
            metal_coordinating_classes: vec!["MAmine:1".to_owned()],
            ..Default::default()
        }
    }

    fn rcv(class: &str) -> Vertex {
        Vertex::ring_closing(50, AttachmentPoint::new(0, Some(class)))
    }

    #[test]
    fn orphan_sites_and_partial_denticity() {
        let mut g = AssemblyGraph::new();
        let metal = g.add_vertex(Vertex::new(
            BuildingBlock::Fragment {
                id: 0,
                kind: BBType::Scaffold,
            },
            vec![AttachmentPoint::new(0, None), AttachmentPoint::new(0, None)],
        ));
        let ligand = g.add_vertex(Vertex::new(
            BuildingBlock::Fragment {
                id: 1,
                kind: BBType::Fragment,
            },
            vec![
                AttachmentPoint::new(0, Some("MAmine:1")),
                AttachmentPoint::new(1, Some("c:0")),
                AttachmentPoint::new(2, Some("c:0")),
            ],
        ));
        let r0 = g.add_vertex(rcv("m:0"));
        let r1 = g.add_vertex(rcv("m:0"));
        g.connect(metal, 0, ligand, 0, BondType::Single).unwrap();
        g.connect(metal, 1, r0, 0, BondType::Single).unwrap();
        g.connect(ligand, 1, r1, 0, BondType::Single).unwrap();

        assert!(!check_chelates(&g, &params()).unwrap());
        assert!(check_chelates(&g, &RingClosureParameters::default()).unwrap());

        g.add_ring(Ring::new(vec![r1, ligand, metal, r0], BondType::Single).unwrap())
            .unwrap();
        assert!(check_chelates(&g, &params()).unwrap());

        // A bidentate arm below the ligand that closes no ring.
        let arm = g.add_vertex(Vertex::new(
            BuildingBlock::Fragment {
                id: 2,
                kind: BBType::Fragment,
            },
            vec![
                AttachmentPoint::new(0, None),
                AttachmentPoint::new(1, None),
                AttachmentPoint::new(2, None),
            ],
        ));
        let a1 = g.add_vertex(rcv("x:1"));
        let a2 = g.add_vertex(rcv("x:1"));
        g.connect(ligand, 2, arm, 0, BondType::Single).unwrap();
        g.connect(arm, 1, a1, 0, BondType::Single).unwrap();
        g.connect(arm, 2, a2, 0, BondType::Single).unwrap();
        assert!(!check_chelates(&g, &params()).unwrap());
    }
}
