//! Systematic torsional search for ring-closing conformations.
//!
//! The chain goes from the head attractor to the tail attractor. Rotating
//! bond `b` (between points `b` and `b + 1`) moves every point after `b + 1`.
//! The search walks the grid of torsion increments depth-first, one bond per
//! level, and tests the closure condition at every leaf.

use nalgebra::Point3;
use tracing::{debug, trace};

use crate::{
    config::RingClosureParameters,
    error::{Error, Result},
    geometry::{bond_angle, dihedral, normalize_angle, rotate_about_axis, ClosureTolerances, RingClosure},
};

/// Verdict of a torsional search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchOutcome {
    pub closable: bool,
    /// Dihedral vectors (one angle per bond, degrees) that close the ring.
    pub conformations: Vec<Vec<f64>>,
    /// Whether the chain was too long to be searched.
    pub skipped: bool,
    pub leaves: usize,
}

#[derive(Debug, Copy, Clone)]
struct Frame {
    bond: usize,
    taken: usize,
    total: usize,
}

#[derive(Debug, Clone)]
pub struct TorsionalSearch {
    step: f64,
    linearity_limit: f64,
    max_rotatable_bonds: usize,
    exhaustive: bool,
    tolerances: ClosureTolerances,
}

impl TorsionalSearch {
    /// Fails on out-of-range parameters, such as a non-positive step.
    pub fn new(params: &RingClosureParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            step: params.torsion_step,
            linearity_limit: params.linearity_limit,
            max_rotatable_bonds: params.max_rotatable_bonds,
            exhaustive: params.exhaustive_search,
            tolerances: params.tolerances(),
        })
    }

    pub fn with_exhaustive(mut self, exhaustive: bool) -> Self {
        self.exhaustive = exhaustive;
        self
    }

    /// Search the torsional space of `points`.
    ///
    /// `rotatable` has one flag per bond and `dihedral_refs` one quadruple per
    /// internal bond (all bonds but the first and the last). The terminal
    /// attractor bonds are never rotated, whatever their flags say. The input
    /// points are not modified.
    pub fn evaluate(
        &self,
        points: &[Point3<f64>],
        rotatable: &[bool],
        dihedral_refs: &[[Point3<f64>; 4]],
    ) -> Result<SearchOutcome> {
        let n = points.len();
        if n < 2 {
            return Err(Error::structural(format!("chain of {n} points cannot close a ring")));
        }
        let nb = n - 1;
        if rotatable.len() != nb {
            return Err(Error::structural(format!(
                "{} rotatability flags for {nb} bonds",
                rotatable.len()
            )));
        }
        if dihedral_refs.len() != nb.saturating_sub(2) {
            return Err(Error::structural(format!(
                "{} dihedral references for {nb} bonds",
                dihedral_refs.len()
            )));
        }

        if n > self.max_rotatable_bonds + 2 {
            debug!(atoms = n, "chain too long for systematic search, assuming closable");
            return Ok(SearchOutcome {
                closable: true,
                skipped: true,
                ..Default::default()
            });
        }

        let mut rotatable = rotatable.to_vec();
        rotatable[0] = false;
        rotatable[nb - 1] = false;
        // Nearly linear angles make the adjacent torsions meaningless.
        for i in 2..n {
            if bond_angle(&points[i - 2], &points[i - 1], &points[i]) >= self.linearity_limit {
                rotatable[i - 1] = false;
            }
        }

        let mut base = vec![0.0; nb];
        for b in 1..nb.saturating_sub(1) {
            let [p0, p1, p2, p3] = &dihedral_refs[b - 1];
            base[b] = dihedral(p0, p1, p2, p3);
        }

        let mut chain = points.to_vec();
        let outcome = self.explore(&mut chain, &rotatable, &base);
        debug!(
            atoms = n,
            leaves = outcome.leaves,
            found = outcome.conformations.len(),
            "torsional search done"
        );
        Ok(outcome)
    }

    fn steps_for(&self, rotatable: bool) -> usize {
        if rotatable {
            ((360.0 / self.step) as usize).max(1)
        } else {
            1
        }
    }

    fn rotate(&self, chain: &mut [Point3<f64>], bond: usize, deg: f64) {
        if bond + 2 >= chain.len() {
            return;
        }
        let (origin, towards) = (chain[bond], chain[bond + 1]);
        rotate_about_axis(&mut chain[bond + 2..], origin, towards, deg);
    }

    /// Put back the rotations done by a frame that is being abandoned.
    fn unwind(&self, chain: &mut [Point3<f64>], frame: &Frame, increments: &mut [f64]) {
        if frame.taken > 1 {
            let back = self.step * (frame.taken - 1) as f64;
            self.rotate(chain, frame.bond, -back);
            increments[frame.bond] -= back;
        }
    }

    fn explore(&self, chain: &mut [Point3<f64>], rotatable: &[bool], base: &[f64]) -> SearchOutcome {
        let nb = rotatable.len();
        let conditions_at = |chain: &[Point3<f64>]| {
            RingClosure::from_chain(chain).map(|rc| rc.is_closable(&rc.conditions(&self.tolerances)))
        };

        let mut outcome = SearchOutcome::default();
        let mut increments = vec![0.0; nb];
        let mut stack = vec![Frame {
            bond: 0,
            taken: 0,
            total: self.steps_for(rotatable[0]),
        }];

        while let Some(frame) = stack.last().copied() {
            if frame.taken == frame.total {
                stack.pop();
                self.unwind(chain, &frame, &mut increments);
                continue;
            }
            if frame.taken > 0 {
                self.rotate(chain, frame.bond, self.step);
                increments[frame.bond] += self.step;
            }
            if let Some(top) = stack.last_mut() {
                top.taken += 1;
            }

            if frame.bond + 1 < nb {
                stack.push(Frame {
                    bond: frame.bond + 1,
                    taken: 0,
                    total: self.steps_for(rotatable[frame.bond + 1]),
                });
                continue;
            }

            outcome.leaves += 1;
            if conditions_at(chain) == Some(true) {
                let conf: Vec<f64> = base
                    .iter()
                    .zip(&increments)
                    .map(|(b, inc)| normalize_angle(b + inc))
                    .collect();
                trace!(?conf, "closable conformation");
                outcome.conformations.push(conf);
                outcome.closable = true;
                if !self.exhaustive {
                    while let Some(frame) = stack.pop() {
                        self.unwind(chain, &frame, &mut increments);
                    }
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(exhaustive: bool, max_rot: usize) -> TorsionalSearch {
        let params = RingClosureParameters {
            max_rotatable_bonds: max_rot,
            torsion_step: 30.0,
            exhaustive_search: exhaustive,
            ..Default::default()
        };
        TorsionalSearch::new(&params).unwrap()
    }

    /// Zig-zag chain of `n` points in the xy plane.
    fn zigzag(n: usize) -> Vec<Point3<f64>> {
        (0..n)
            .map(|i| Point3::new(1.25 * i as f64, if i % 2 == 0 { 0.0 } else { 0.7 }, 0.0))
            .collect()
    }

    fn refs(points: &[Point3<f64>]) -> Vec<[Point3<f64>; 4]> {
        (1..points.len().saturating_sub(2))
            .map(|b| [points[b - 1], points[b], points[b + 1], points[b + 2]])
            .collect()
    }

    #[test]
    fn long_chains_are_assumed_closable() {
        let pts = zigzag(10);
        let out = search(false, 7).evaluate(&pts, &[true; 9], &refs(&pts)).unwrap();
        assert!(out.closable && out.skipped);
        assert!(out.conformations.is_empty());
        assert_eq!(out.leaves, 0);
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let pts = zigzag(5);
        assert!(search(false, 7).evaluate(&pts, &[true; 3], &refs(&pts)).is_err());
        assert!(search(false, 7).evaluate(&pts, &[true; 4], &[]).is_err());
    }

    #[test]
    fn grid_covers_internal_bonds_only() {
        let pts = zigzag(5);
        let internal = search(true, 7)
            .evaluate(&pts, &[false, true, true, false], &refs(&pts))
            .unwrap();
        // Two rotatable bonds at 30 degrees: 12 x 12 leaves.
        assert_eq!(internal.leaves, 144);
        for conf in &internal.conformations {
            assert_eq!(conf.len(), 4);
            assert!(conf.iter().all(|a| *a > -180.0 && *a <= 180.0));
        }

        // Terminal flags are ignored.
        let all = search(true, 7).evaluate(&pts, &[true; 4], &refs(&pts)).unwrap();
        assert_eq!(all, internal);
    }

    fn assert_same_points(a: &[Point3<f64>], b: &[Point3<f64>]) {
        assert_eq!(a.len(), b.len());
        for (p, q) in a.iter().zip(b) {
            assert!((p - q).norm() < 1e-9, "{p} moved to {q}");
        }
    }

    #[test]
    fn exhaustive_search_restores_the_chain() {
        let original = zigzag(6);
        let mut chain = original.clone();
        let rot = [false, true, true, true, false];
        let out = search(true, 7).explore(&mut chain, &rot, &[0.0; 5]);
        assert_eq!(out.leaves, 12 * 12 * 12);
        assert_same_points(&chain, &original);
    }

    /// Planar six-membered ring read from head attractor to tail attractor,
    /// with the far half turned 90 degrees out of plane about bond 3.
    fn twisted_hexagon() -> Vec<Point3<f64>> {
        let corner = |k: usize| {
            let a = std::f64::consts::PI / 3.0 * k as f64;
            Point3::new(1.5 * a.cos(), 1.5 * a.sin(), 0.0)
        };
        let mut pts: Vec<_> = [3, 2, 1, 0, 5, 4, 3, 2].into_iter().map(corner).collect();
        let (origin, towards) = (pts[3], pts[4]);
        rotate_about_axis(&mut pts[5..], origin, towards, -90.0);
        pts
    }

    #[test]
    fn early_exit_restores_the_chain() {
        let original = twisted_hexagon();
        let mut chain = original.clone();
        let rot = [false, true, true, true, true, true, false];
        let out = search(false, 7).explore(&mut chain, &rot, &[0.0; 7]);
        assert!(out.closable);
        assert_eq!(out.conformations.len(), 1);
        // The search had to turn bond 3 before finding the ring.
        assert!(out.leaves > 1);
        assert_same_points(&chain, &original);
    }

    #[test]
    fn non_positive_steps_are_rejected() {
        for step in [0.0, -12.0, f64::NAN] {
            let params = RingClosureParameters {
                torsion_step: step,
                ..Default::default()
            };
            assert!(matches!(TorsionalSearch::new(&params), Err(Error::Configuration(_))));
        }
    }

    #[test]
    fn linear_angles_freeze_torsions() {
        let pts: Vec<_> = (0..5).map(|i| Point3::new(1.5 * i as f64, 0.0, 0.0)).collect();
        let rot = [false, true, true, false];
        let out = search(true, 7).evaluate(&pts, &rot, &refs(&pts)).unwrap();
        assert_eq!(out.leaves, 1);
        assert!(!out.closable);
    }
}
