#![allow(dead_code)]

use std::f64::consts::PI;

use nalgebra::Point3;
use ring_closure::{
    graph::{AssemblyGraph, AttachmentPoint, BBType, BondType, BuildingBlock, Vertex, VertexIx},
    molecule::{Atom, AtomIx, AtomKind, AttractorKind, Bond, BondOrder, Element, Molecule},
};

/// One branch hanging from the root: a run of carbon vertices ending in a
/// ring-closing vertex.
#[derive(Debug, Clone)]
pub struct Arm {
    pub carbons: usize,
    pub attractor: AttractorKind,
    pub bond: BondType,
    /// Class of the attachment point holding the ring-closing vertex.
    pub class: Option<&'static str>,
    /// Carbon positions followed by the attractor position.
    pub positions: Option<Vec<Point3<f64>>>,
}

pub fn arm(carbons: usize, attractor: AttractorKind) -> Arm {
    Arm {
        carbons,
        attractor,
        bond: BondType::Single,
        class: None,
        positions: None,
    }
}

impl Arm {
    pub fn bond(mut self, bond: BondType) -> Self {
        self.bond = bond;
        self
    }

    pub fn class(mut self, class: &'static str) -> Self {
        self.class = Some(class);
        self
    }

    pub fn at(mut self, positions: Vec<Point3<f64>>) -> Self {
        self.positions = Some(positions);
        self
    }
}

pub struct System {
    pub graph: AssemblyGraph,
    pub molecule: Molecule,
    pub root: VertexIx,
    /// Ring-closing vertex at the end of each arm.
    pub rcvs: Vec<VertexIx>,
}

fn fragment(id: usize, kind: BBType, aps: Vec<AttachmentPoint>) -> Vertex {
    Vertex::new(BuildingBlock::Fragment { id, kind }, aps)
}

/// A scaffold atom of `root_element` with one arm per entry of `arms`.
pub fn star(root_element: Element, arms: &[Arm]) -> System {
    star_at(root_element, Point3::origin(), arms)
}

pub fn star_at(root_element: Element, root_position: Point3<f64>, arms: &[Arm]) -> System {
    let mut graph = AssemblyGraph::new();
    let mut molecule = Molecule::new();

    let root_aps = arms
        .iter()
        .map(|a| AttachmentPoint::new(0, if a.carbons == 0 { a.class } else { None }))
        .collect();
    let root = graph.add_vertex(fragment(0, BBType::Scaffold, root_aps));
    let root_atom = molecule.add_atom(Atom::new(AtomKind::Element(root_element), root, root_position));

    let mut rcvs = Vec::new();
    for (k, shape) in arms.iter().enumerate() {
        let angle = 2.0 * PI * k as f64 / arms.len() as f64;
        let place = |depth: usize| {
            let r = 1.5 * (depth + 1) as f64;
            let wiggle = if depth % 2 == 0 { 0.0 } else { 0.4 };
            Point3::new(r * angle.cos(), r * angle.sin(), wiggle)
        };
        rcvs.push(grow(&mut graph, &mut molecule, (root, k, root_atom), shape, place));
    }

    System {
        graph,
        molecule,
        root,
        rcvs,
    }
}

/// Hang `shape` from attachment point `from.1` of vertex `from.0`, whose atom
/// is `from.2`, and return the ring-closing vertex at its end. Positions
/// given by the arm win over `place`.
fn grow(
    graph: &mut AssemblyGraph,
    molecule: &mut Molecule,
    from: (VertexIx, usize, AtomIx),
    shape: &Arm,
    place: impl Fn(usize) -> Point3<f64>,
) -> VertexIx {
    let place = |depth: usize| shape.positions.as_ref().map_or_else(|| place(depth), |p| p[depth]);

    let (mut parent, mut parent_ap, mut parent_atom) = from;
    for depth in 0..shape.carbons {
        let last = depth + 1 == shape.carbons;
        let v = graph.add_vertex(fragment(
            1,
            BBType::Fragment,
            vec![
                AttachmentPoint::new(0, None),
                AttachmentPoint::new(0, if last { shape.class } else { None }),
            ],
        ));
        graph
            .connect(parent, parent_ap, v, 0, BondType::Single)
            .expect("fixture edge");
        let atom = molecule.add_atom(Atom::new(AtomKind::Element(Element::Carbon), v, place(depth)));
        molecule.add_bond(parent_atom, atom, Bond::new(BondOrder::Single, true));
        (parent, parent_ap, parent_atom) = (v, 1, atom);
    }

    let rcv = graph.add_vertex(Vertex::ring_closing(99, AttachmentPoint::new(0, None)));
    graph
        .connect(parent, parent_ap, rcv, 0, shape.bond)
        .expect("fixture edge");
    let rca = molecule.add_atom(Atom::new(
        AtomKind::Attractor(shape.attractor),
        rcv,
        place(shape.carbons),
    ));
    let order = shape.bond.order().unwrap_or(BondOrder::Single);
    molecule.add_bond(parent_atom, rca, Bond::new(order, false));
    rcv
}

/// A carbon root holding the first two arms and a carbon hub, bonded to the
/// root by a rotatable bond, holding the other two. Any chord from a root arm
/// to a hub arm crosses the root-hub bond.
pub fn fork(arms: [Arm; 4]) -> System {
    let mut graph = AssemblyGraph::new();
    let mut molecule = Molecule::new();
    let carbon = AtomKind::Element(Element::Carbon);
    let blank = || AttachmentPoint::new(0, None);

    let root = graph.add_vertex(fragment(0, BBType::Scaffold, vec![blank(), blank(), blank()]));
    let root_atom = molecule.add_atom(Atom::new(carbon, root, Point3::origin()));
    let hub = graph.add_vertex(fragment(2, BBType::Fragment, vec![blank(), blank(), blank()]));
    graph.connect(root, 0, hub, 0, BondType::Single).expect("fixture edge");
    let hub_at = Point3::new(1.5, 0.0, 0.0);
    let hub_atom = molecule.add_atom(Atom::new(carbon, hub, hub_at));
    molecule.add_bond(root_atom, hub_atom, Bond::new(BondOrder::Single, true));

    let mut rcvs = Vec::new();
    for (k, shape) in arms.iter().enumerate() {
        let side = if k % 2 == 0 { 1.0 } else { -1.0 };
        let (origin, dx, from) = if k < 2 {
            (Point3::origin(), -1.0, (root, k + 1, root_atom))
        } else {
            (hub_at, 1.0, (hub, k - 1, hub_atom))
        };
        let place = move |depth: usize| {
            let r = 1.2 * (depth + 1) as f64;
            let wiggle = if depth % 2 == 0 { 0.0 } else { 0.4 };
            origin + nalgebra::Vector3::new(dx * r, side * r, wiggle)
        };
        rcvs.push(grow(&mut graph, &mut molecule, from, shape, place));
    }

    System {
        graph,
        molecule,
        root,
        rcvs,
    }
}

/// Regular hexagon of 1.5 Å bonds: corner `k` of six.
pub fn corner(k: usize) -> Point3<f64> {
    let a = PI / 3.0 * k as f64;
    Point3::new(1.5 * a.cos(), 1.5 * a.sin(), 0.0)
}

/// Two arms around a root on corner 0 that close a planar six-membered ring
/// in their starting geometry: each attractor sits on the source atom of
/// the other end.
pub fn hexagon() -> System {
    star_at(
        Element::Carbon,
        corner(0),
        &[
            arm(2, AttractorKind::Plus).at(vec![corner(1), corner(2), corner(3)]),
            arm(3, AttractorKind::Minus).at(vec![corner(5), corner(4), corner(3), corner(2)]),
        ],
    )
}

/// Two arms that stretch away from each other along a straight line.
pub fn open_chain(carbons: usize) -> System {
    let line = |dir: f64| -> Vec<Point3<f64>> {
        (0..=carbons)
            .map(|d| Point3::new(dir * 1.5 * (d + 1) as f64, if d % 2 == 0 { 0.5 } else { 0.0 }, 0.0))
            .collect()
    };
    star(
        Element::Carbon,
        &[
            arm(carbons, AttractorKind::Plus).at(line(-1.0)),
            arm(carbons, AttractorKind::Minus).at(line(1.0)),
        ],
    )
}
