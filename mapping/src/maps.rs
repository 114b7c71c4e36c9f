use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::mapping::{Direction, MapError, MapResult, Mapping};
use crate::point_set::PointSet;

/// Identity mapping: every point is returned unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitMap {
    naxes: usize,
}

impl UnitMap {
    pub fn new(naxes: usize) -> UnitMap {
        assert!(naxes >= 1, "UnitMap needs at least one axis");
        UnitMap { naxes }
    }

    pub fn naxes(&self) -> usize {
        self.naxes
    }

    pub(crate) fn transform(&self, points: PointSet, _direction: Direction) -> PointSet {
        points
    }

    pub(crate) fn inverted(&self) -> UnitMap {
        self.clone()
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.naxes == 0 {
            return Err(anyhow::Error::msg("Unit mapping has zero axes"));
        }
        Ok(())
    }
}

/// Uniform scale about the origin by a fixed non-zero factor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoomMap {
    naxes: usize,
    factor: f64,
}

impl ZoomMap {
    pub fn new(naxes: usize, factor: f64) -> ZoomMap {
        assert!(naxes >= 1, "ZoomMap needs at least one axis");
        assert!(
            factor.is_finite() && factor != 0.0,
            "Zoom factor must be finite and non-zero, got {}",
            factor
        );

        ZoomMap { naxes, factor }
    }

    pub fn naxes(&self) -> usize {
        self.naxes
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub(crate) fn transform(&self, mut points: PointSet, direction: Direction) -> PointSet {
        let factor = match direction {
            Direction::Forward => self.factor,
            Direction::Inverse => 1.0 / self.factor,
        };
        for coord in points.coords_mut() {
            *coord *= factor;
        }
        points
    }

    pub(crate) fn inverted(&self) -> ZoomMap {
        ZoomMap::new(self.naxes, 1.0 / self.factor)
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.naxes == 0 {
            return Err(anyhow::Error::msg("Zoom mapping has zero axes"));
        }
        if !self.factor.is_finite() || self.factor == 0.0 {
            return Err(anyhow::Error::msg("Zoom mapping has a degenerate factor"));
        }
        Ok(())
    }
}

/// Per-axis offset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShiftMap {
    offsets: Vec<f64>,
}

impl ShiftMap {
    pub fn new(offsets: Vec<f64>) -> ShiftMap {
        assert!(!offsets.is_empty(), "ShiftMap needs at least one axis");
        ShiftMap { offsets }
    }

    pub fn naxes(&self) -> usize {
        self.offsets.len()
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    pub(crate) fn transform(&self, mut points: PointSet, direction: Direction) -> PointSet {
        let naxes = self.offsets.len();
        for point in points.coords_mut().chunks_exact_mut(naxes) {
            for (coord, offset) in point.iter_mut().zip(self.offsets.iter()) {
                match direction {
                    Direction::Forward => *coord += offset,
                    Direction::Inverse => *coord -= offset,
                }
            }
        }
        points
    }

    pub(crate) fn inverted(&self) -> ShiftMap {
        ShiftMap::new(self.offsets.iter().map(|offset| -offset).collect())
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.offsets.is_empty() {
            return Err(anyhow::Error::msg("Shift mapping has zero axes"));
        }
        Ok(())
    }
}

/// Per-axis linear transform mapping one window onto another: the corner
/// pair `(in_lo, in_hi)` lands on `(out_lo, out_hi)`.
///
/// Invertible iff no output axis collapses to a single value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WinMap {
    in_lo: Vec<f64>,
    in_hi: Vec<f64>,
    out_lo: Vec<f64>,
    out_hi: Vec<f64>,
}

impl WinMap {
    pub fn new(in_lo: Vec<f64>, in_hi: Vec<f64>, out_lo: Vec<f64>, out_hi: Vec<f64>) -> WinMap {
        assert!(!in_lo.is_empty(), "WinMap needs at least one axis");
        assert!(
            in_lo.len() == in_hi.len()
                && in_lo.len() == out_lo.len()
                && in_lo.len() == out_hi.len(),
            "WinMap corner vectors must have equal lengths"
        );
        assert!(
            in_lo.iter().zip(in_hi.iter()).all(|(lo, hi)| lo != hi),
            "WinMap input window must have non-zero width on every axis"
        );

        WinMap {
            in_lo,
            in_hi,
            out_lo,
            out_hi,
        }
    }

    pub fn naxes(&self) -> usize {
        self.in_lo.len()
    }

    fn scale(&self, axis: usize) -> f64 {
        (self.out_hi[axis] - self.out_lo[axis]) / (self.in_hi[axis] - self.in_lo[axis])
    }

    pub(crate) fn is_invertible(&self) -> bool {
        self.out_lo
            .iter()
            .zip(self.out_hi.iter())
            .all(|(lo, hi)| lo != hi)
    }

    pub(crate) fn transform(&self, mut points: PointSet, direction: Direction) -> PointSet {
        let naxes = self.naxes();
        for point in points.coords_mut().chunks_exact_mut(naxes) {
            for (axis, coord) in point.iter_mut().enumerate() {
                let scale = self.scale(axis);
                *coord = match direction {
                    Direction::Forward => (*coord - self.in_lo[axis]) * scale + self.out_lo[axis],
                    Direction::Inverse => (*coord - self.out_lo[axis]) / scale + self.in_lo[axis],
                };
            }
        }
        points
    }

    pub(crate) fn inverted(&self) -> WinMap {
        WinMap::new(
            self.out_lo.clone(),
            self.out_hi.clone(),
            self.in_lo.clone(),
            self.in_hi.clone(),
        )
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.in_lo.is_empty() {
            return Err(anyhow::Error::msg("Window mapping has zero axes"));
        }
        if self.in_lo.len() != self.in_hi.len()
            || self.in_lo.len() != self.out_lo.len()
            || self.in_lo.len() != self.out_hi.len()
        {
            return Err(anyhow::Error::msg(
                "Window mapping corner vectors have mismatched lengths",
            ));
        }
        if self.in_lo.iter().zip(self.in_hi.iter()).any(|(lo, hi)| lo == hi) {
            return Err(anyhow::Error::msg(
                "Window mapping input window collapses an axis",
            ));
        }
        Ok(())
    }
}

/// Axis selection: output axis `j` copies input axis `targets[j]`.
///
/// Invertible iff `targets` is a permutation of the input axes; a selection
/// that drops or duplicates axes has no inverse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PermMap {
    nin: usize,
    targets: Vec<usize>,
}

impl PermMap {
    pub fn new(nin: usize, targets: Vec<usize>) -> PermMap {
        assert!(nin >= 1, "PermMap needs at least one input axis");
        assert!(!targets.is_empty(), "PermMap needs at least one output axis");
        assert!(
            targets.iter().all(|&target| target < nin),
            "PermMap target axis out of range 0..{}",
            nin
        );

        PermMap { nin, targets }
    }

    pub fn nin(&self) -> usize {
        self.nin
    }

    pub fn nout(&self) -> usize {
        self.targets.len()
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    pub(crate) fn is_invertible(&self) -> bool {
        if self.targets.len() != self.nin {
            return false;
        }
        let mut seen = vec![false; self.nin];
        for &target in &self.targets {
            if seen[target] {
                return false;
            }
            seen[target] = true;
        }
        true
    }

    pub(crate) fn transform(&self, points: PointSet, direction: Direction) -> PointSet {
        let inverse;
        let (targets, expected_naxes) = match direction {
            Direction::Forward => (&self.targets, self.nin),
            Direction::Inverse => {
                inverse = self.inverted();
                (&inverse.targets, self.nout())
            }
        };
        assert_eq!(points.naxes(), expected_naxes);

        let mut out = PointSet::new(targets.len());
        let mut scratch = Vec::with_capacity(targets.len());
        for point in points.iter() {
            scratch.clear();
            scratch.extend(targets.iter().map(|&target| point[target]));
            out.push(&scratch);
        }
        out
    }

    pub(crate) fn inverted(&self) -> PermMap {
        assert!(
            self.is_invertible(),
            "Cannot invert a non-bijective axis selection"
        );

        let mut inverse_targets = vec![0usize; self.nin];
        for (axis, &target) in self.targets.iter().enumerate() {
            inverse_targets[target] = axis;
        }
        PermMap::new(self.nout(), inverse_targets)
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.nin == 0 || self.targets.is_empty() {
            return Err(anyhow::Error::msg("Axis selection has zero axes"));
        }
        if self.targets.iter().any(|&target| target >= self.nin) {
            return Err(anyhow::Error::msg("Axis selection target out of range"));
        }
        Ok(())
    }
}

/// Splices two mappings into one: the forward transform is taken from
/// `forward` and the inverse transform from `inverse`.
///
/// The two halves need not agree, so applying forward and then inverse does
/// not necessarily round-trip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranMap {
    forward: Arc<Mapping>,
    inverse: Arc<Mapping>,
}

impl TranMap {
    pub fn new(
        forward: impl Into<Arc<Mapping>>,
        inverse: impl Into<Arc<Mapping>>,
    ) -> MapResult<TranMap> {
        let forward = forward.into();
        let inverse = inverse.into();

        if forward.nin() != inverse.nin() {
            return Err(MapError::DimensionMismatch {
                context: "splicing transform halves (input)".to_string(),
                expected: forward.nin(),
                actual: inverse.nin(),
            });
        }
        if forward.nout() != inverse.nout() {
            return Err(MapError::DimensionMismatch {
                context: "splicing transform halves (output)".to_string(),
                expected: forward.nout(),
                actual: inverse.nout(),
            });
        }

        Ok(TranMap { forward, inverse })
    }

    pub fn nin(&self) -> usize {
        self.forward.nin()
    }

    pub fn nout(&self) -> usize {
        self.forward.nout()
    }

    pub fn forward(&self) -> &Arc<Mapping> {
        &self.forward
    }

    pub fn inverse(&self) -> &Arc<Mapping> {
        &self.inverse
    }

    pub(crate) fn validate_shape(&self) -> anyhow::Result<()> {
        if self.forward.nin() != self.inverse.nin() || self.forward.nout() != self.inverse.nout() {
            return Err(anyhow::Error::msg(
                "Spliced transform halves have mismatched shapes",
            ));
        }
        Ok(())
    }
}
