//! Small Cartesian helpers and the ring-closure distance/angle test.

use clap::ValueEnum;
use nalgebra::{Point3, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

/// How the head and tail bond vectors must line up for a ring to close.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClosureStrategy {
    /// Each attractor sits on the opposite end's source atom, roughly
    /// reproducing the bond it will form.
    BondOverlap,
    /// Each end points at the other's source atom at bond distance, and the
    /// two attractors nearly coincide.
    BondComplementarity,
}

/// Tolerances used to build [`ClosureConditions`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClosureTolerances {
    pub strategy: ClosureStrategy,
    pub distance_factor: f64,
    pub extra_factor: f64,
    pub max_dot: f64,
}

/// Accepted ranges for the three inter-end distances, and the upper bound on
/// the dot product of the two bond directions. A negative bound means
/// "unbounded".
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClosureConditions {
    pub min_h1t2: f64,
    pub max_h1t2: f64,
    pub min_h2t1: f64,
    pub max_h2t1: f64,
    pub min_h2t2: f64,
    pub max_h2t2: f64,
    pub max_dot: f64,
}

/// The two ends of an open ring: source atom (`h1`, `t1`) and attractor
/// (`h2`, `t2`) on each side.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RingClosure {
    pub h1: Point3<f64>,
    pub h2: Point3<f64>,
    pub t1: Point3<f64>,
    pub t2: Point3<f64>,
}

impl RingClosure {
    pub fn new(h1: Point3<f64>, h2: Point3<f64>, t1: Point3<f64>, t2: Point3<f64>) -> Self {
        Self { h1, h2, t1, t2 }
    }

    /// Read the ends off an attractor-to-attractor chain of points.
    pub fn from_chain(points: &[Point3<f64>]) -> Option<Self> {
        let n = points.len();
        if n < 2 {
            return None;
        }
        Some(Self::new(points[1], points[0], points[n - 2], points[n - 1]))
    }

    pub fn head_length(&self) -> f64 {
        (self.h2 - self.h1).norm()
    }

    pub fn tail_length(&self) -> f64 {
        (self.t2 - self.t1).norm()
    }

    /// Distance windows derived from the current bond lengths.
    pub fn conditions(&self, tol: &ClosureTolerances) -> ClosureConditions {
        let len_h = self.head_length();
        let len_t = self.tail_length();
        let dist_tol = (len_h + len_t) / 2.0 * tol.extra_factor * tol.distance_factor;
        match tol.strategy {
            ClosureStrategy::BondOverlap => ClosureConditions {
                min_h1t2: -1.0,
                max_h1t2: dist_tol,
                min_h2t1: -1.0,
                max_h2t1: dist_tol,
                min_h2t2: -1.0,
                max_h2t2: len_h + len_t,
                max_dot: tol.max_dot,
            },
            ClosureStrategy::BondComplementarity => {
                let dt = dist_tol / 2.0;
                ClosureConditions {
                    min_h1t2: len_h - dt,
                    max_h1t2: len_h + dt,
                    min_h2t1: len_t - dt,
                    max_h2t1: len_t + dt,
                    min_h2t2: -1.0,
                    max_h2t2: dt * tol.distance_factor,
                    max_dot: tol.max_dot,
                }
            }
        }
    }

    pub fn is_closable(&self, c: &ClosureConditions) -> bool {
        let within = |d: f64, min: f64, max: f64| (min < 0.0 || d >= min) && (max < 0.0 || d <= max);
        let h1t2 = (self.t2 - self.h1).norm();
        let h2t1 = (self.t1 - self.h2).norm();
        let h2t2 = (self.t2 - self.h2).norm();
        if !within(h1t2, c.min_h1t2, c.max_h1t2)
            || !within(h2t1, c.min_h2t1, c.max_h2t1)
            || !within(h2t2, c.min_h2t2, c.max_h2t2)
        {
            return false;
        }
        let (Some(h), Some(t)) = (
            Unit::try_new(self.h2 - self.h1, 1e-12),
            Unit::try_new(self.t2 - self.t1, 1e-12),
        ) else {
            return false;
        };
        h.dot(&t) <= c.max_dot
    }
}

/// Angle a-b-c in degrees.
pub fn bond_angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (a - b).angle(&(c - b)).to_degrees()
}

/// Dihedral angle p0-p1-p2-p3 in degrees, in (-180, 180].
pub fn dihedral(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>) -> f64 {
    let b1 = p1 - p0;
    let b2 = p2 - p1;
    let b3 = p3 - p2;
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let Some(axis) = Unit::try_new(b2, 1e-12) else {
        return 0.0;
    };
    let m1 = n1.cross(axis.as_ref());
    let x = n1.dot(&n2);
    let y = m1.dot(&n2);
    normalize_angle(y.atan2(x).to_degrees())
}

/// Map an angle in degrees into (-180, 180].
pub fn normalize_angle(deg: f64) -> f64 {
    let mut a = deg % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

/// Smallest absolute difference between two angles in degrees.
pub fn angular_distance(a: f64, b: f64) -> f64 {
    normalize_angle(a - b).abs()
}

/// Rotate every point of `points` by `deg` degrees around the axis going from
/// `origin` to `towards`. Degenerate axes leave the points untouched.
pub fn rotate_about_axis(points: &mut [Point3<f64>], origin: Point3<f64>, towards: Point3<f64>, deg: f64) {
    let axis: Vector3<f64> = towards - origin;
    let Some(axis) = Unit::try_new(axis, 1e-12) else {
        return;
    };
    let rot = Rotation3::from_axis_angle(&axis, deg.to_radians());
    for p in points.iter_mut() {
        *p = origin + rot * (*p - origin);
    }
}
