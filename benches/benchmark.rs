use std::f64::consts::PI;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Point3;

use ring_closure::{
    closability::ClosabilityMode,
    config::RingClosureParameters,
    context::RingClosureContext,
    enumerate::{CombinationEnumerator, ParallelMode},
    graph::{AssemblyGraph, AttachmentPoint, BBType, BondType, BuildingBlock, Vertex},
    molecule::{Atom, AtomKind, AttractorKind, Bond, BondOrder, Element, Molecule},
    torsion::TorsionalSearch,
};

/// A carbon root with `arms` chains of `carbons` carbons, each ending in a
/// ring-closing vertex; attractor kinds alternate between plus and minus.
fn star(arms: usize, carbons: usize) -> (AssemblyGraph, Molecule) {
    let mut graph = AssemblyGraph::new();
    let mut mol = Molecule::new();
    let fragment = |id, kind, naps: usize| {
        let aps = (0..naps).map(|_| AttachmentPoint::new(0, None)).collect();
        Vertex::new(BuildingBlock::Fragment { id, kind }, aps)
    };
    let single = Bond::new(BondOrder::Single, true);

    let root = graph.add_vertex(fragment(0, BBType::Scaffold, arms));
    let root_atom = mol.add_atom(Atom::new(AtomKind::Element(Element::Carbon), root, Point3::origin()));
    for k in 0..arms {
        let angle = 2.0 * PI * k as f64 / arms as f64;
        let place = |d: usize| {
            let r = 1.5 * (d + 1) as f64;
            Point3::new(r * angle.cos(), r * angle.sin(), if d % 2 == 0 { 0.0 } else { 0.4 })
        };
        let (mut parent, mut ap, mut atom) = (root, k, root_atom);
        for d in 0..carbons {
            let v = graph.add_vertex(fragment(1, BBType::Fragment, 2));
            graph.connect(parent, ap, v, 0, BondType::Single).unwrap();
            let a = mol.add_atom(Atom::new(AtomKind::Element(Element::Carbon), v, place(d)));
            mol.add_bond(atom, a, single);
            (parent, ap, atom) = (v, 1, a);
        }
        let rcv = graph.add_vertex(Vertex::ring_closing(99, AttachmentPoint::new(0, None)));
        graph.connect(parent, ap, rcv, 0, BondType::Single).unwrap();
        let kind = if k % 2 == 0 { AttractorKind::Plus } else { AttractorKind::Minus };
        let rca = mol.add_atom(Atom::new(AtomKind::Attractor(kind), rcv, place(carbons)));
        mol.add_bond(atom, rca, Bond::new(BondOrder::Single, false));
    }
    (graph, mol)
}

/// Zig-zag chain of `n` points and the reference points of its torsions.
fn zigzag(n: usize) -> (Vec<Point3<f64>>, Vec<[Point3<f64>; 4]>) {
    let points: Vec<_> = (0..n)
        .map(|i| Point3::new(1.25 * i as f64, if i % 2 == 0 { 0.0 } else { 0.7 }, 0.0))
        .collect();
    let refs = (1..n.saturating_sub(2))
        .map(|b| [points[b - 1], points[b], points[b + 1], points[b + 2]])
        .collect();
    (points, refs)
}

pub fn torsional_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("torsional_search");

    for atoms in [5, 6, 7] {
        let (points, refs) = zigzag(atoms);
        let mut rotatable = vec![true; atoms - 1];
        rotatable[0] = false;
        rotatable[atoms - 2] = false;
        let params = RingClosureParameters {
            torsion_step: 30.0,
            ..Default::default()
        };
        let search = TorsionalSearch::new(&params).unwrap().with_exhaustive(true);
        group.bench_with_input(BenchmarkId::new("exhaustive", atoms), &atoms, |b, _| {
            b.iter(|| search.evaluate(&points, &rotatable, &refs).unwrap());
        });
    }

    group.finish();
}

pub fn all_combinations(c: &mut Criterion) {
    let mut group = c.benchmark_group("all_combinations");

    for arms in [4, 6, 8] {
        let (graph, mol) = star(arms, 2);
        for (parallel, label) in [(ParallelMode::None, "serial"), (ParallelMode::Always, "parallel")] {
            // A fresh context per run so that the archive starts empty.
            group.bench_with_input(BenchmarkId::new(label, arms), &arms, |b, _| {
                b.iter(|| {
                    let ctx = RingClosureContext::new(RingClosureParameters {
                        mode: ClosabilityMode::Geometry,
                        torsion_step: 60.0,
                        ..Default::default()
                    })
                    .unwrap();
                    CombinationEnumerator::new(&ctx)
                        .with_parallel_mode(parallel)
                        .all_combinations(&graph, &mol)
                        .unwrap()
                });
            });
        }
    }

    group.finish();
}

criterion_group! {
    name = benchmark;
    config = Criterion::default().sample_size(20);
    targets = torsional_search, all_combinations
}
criterion_main!(benchmark);
