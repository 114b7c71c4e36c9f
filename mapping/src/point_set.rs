use serde::{Deserialize, Serialize};

use common::float_ext::SliceFloatExt;

/// Sentinel for an undefined coordinate value.
///
/// Transforms propagate it: a bad coordinate on an input axis yields a bad
/// coordinate on every output axis that depends on it.
pub const BAD: f64 = f64::NAN;

/// Returns true if `value` is the [`BAD`] sentinel.
///
/// `BAD` is NaN, so `value == BAD` is always false; use this instead.
pub fn is_bad(value: f64) -> bool {
    value.is_nan()
}

/// An ordered batch of N-dimensional coordinate points.
///
/// Coordinates are stored point-major in a flat buffer: point `p`'s axis `a`
/// lives at index `p * naxes + a`. Every point in a set has the same axis
/// count, fixed at construction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    naxes: usize,
    coords: Vec<f64>,
}

impl PointSet {
    pub fn new(naxes: usize) -> PointSet {
        assert!(naxes >= 1, "PointSet needs at least one axis");

        PointSet {
            naxes,
            coords: Vec::new(),
        }
    }

    /// Wraps an existing point-major buffer.
    pub fn from_flat(naxes: usize, coords: Vec<f64>) -> PointSet {
        assert!(naxes >= 1, "PointSet needs at least one axis");
        assert_eq!(
            coords.len() % naxes,
            0,
            "Coordinate buffer length {} is not a multiple of the {} axes",
            coords.len(),
            naxes
        );

        PointSet { naxes, coords }
    }

    pub fn from_points<P: AsRef<[f64]>>(naxes: usize, points: &[P]) -> PointSet {
        let mut set = PointSet::new(naxes);
        for point in points {
            set.push(point.as_ref());
        }
        set
    }

    pub fn push(&mut self, point: &[f64]) {
        assert_eq!(
            point.len(),
            self.naxes,
            "Point has {} axes but the set holds {}-axis points",
            point.len(),
            self.naxes
        );
        self.coords.extend_from_slice(point);
    }

    pub fn naxes(&self) -> usize {
        self.naxes
    }

    /// Number of points in the set.
    pub fn len(&self) -> usize {
        self.coords.len() / self.naxes
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn point(&self, index: usize) -> &[f64] {
        &self.coords[index * self.naxes..(index + 1) * self.naxes]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.coords.chunks_exact(self.naxes)
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub(crate) fn coords_mut(&mut self) -> &mut [f64] {
        &mut self.coords
    }

    /// Splits each point into a leading slice of `axis` coordinates and the
    /// trailing remainder, producing two sets with the same point count.
    pub fn split_at(&self, axis: usize) -> (PointSet, PointSet) {
        assert!(
            axis >= 1 && axis < self.naxes,
            "Split axis {} is outside 1..{}",
            axis,
            self.naxes
        );

        let mut left = PointSet::new(axis);
        let mut right = PointSet::new(self.naxes - axis);
        for point in self.iter() {
            left.push(&point[..axis]);
            right.push(&point[axis..]);
        }
        (left, right)
    }

    /// Joins two sets with equal point counts axis-wise: each result point is
    /// the left point's coordinates followed by the right point's.
    pub fn concat(left: &PointSet, right: &PointSet) -> PointSet {
        assert_eq!(
            left.len(),
            right.len(),
            "Cannot concat point sets of {} and {} points",
            left.len(),
            right.len()
        );

        let mut joined = PointSet::new(left.naxes + right.naxes);
        joined.coords.reserve(left.coords.len() + right.coords.len());
        for (a, b) in left.iter().zip(right.iter()) {
            joined.coords.extend_from_slice(a);
            joined.coords.extend_from_slice(b);
        }
        joined
    }

    /// Element-wise comparison within the workspace tolerance.
    pub fn approximately_eq(&self, other: &PointSet) -> bool {
        self.naxes == other.naxes && self.coords.approximately_eq(&other.coords)
    }
}
