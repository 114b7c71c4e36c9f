use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use thiserror::Error;
use tracing::trace;

use common::normalize_string::NormalizeString;

use crate::compound::CompoundMap;
use crate::maps::{PermMap, ShiftMap, TranMap, UnitMap, WinMap, ZoomMap};
use crate::point_set::PointSet;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("Dimension mismatch while {context}: expected {expected} axes, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },
    #[error("Mapping from {nin} to {nout} axes does not define an inverse")]
    NotInvertible { nin: usize, nout: usize },
    #[error("Compound mapping is in {actual}")]
    ModeMismatch { expected: MapMode, actual: MapMode },
}

pub type MapResult<T> = std::result::Result<T, MapError>;

/// How a compound combines its two children.
#[derive(Clone, Copy, Debug, Display, EnumIter, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapMode {
    /// The first child's output feeds the second child's input.
    #[strum(serialize = "series")]
    Series,
    /// Each child transforms its own disjoint slice of the coordinates.
    #[strum(serialize = "parallel")]
    Parallel,
}

/// Which transform of a mapping to evaluate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Inverse,
}

/// A transform between two fixed-dimension coordinate spaces.
///
/// The set of kinds is closed: every mapping is one of the concrete leaf
/// transforms or a [`CompoundMap`] combining two mappings in series or in
/// parallel. Compounds hold their children by shared reference, so a mapping
/// may appear in any number of trees at once; [`Mapping::copy`] produces a
/// deep copy that shares nothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Mapping {
    Unit(UnitMap),
    Zoom(ZoomMap),
    Shift(ShiftMap),
    Win(WinMap),
    Perm(PermMap),
    Tran(TranMap),
    Compound(CompoundMap),
}

impl Mapping {
    /// Number of input axes.
    pub fn nin(&self) -> usize {
        match self {
            Mapping::Unit(map) => map.naxes(),
            Mapping::Zoom(map) => map.naxes(),
            Mapping::Shift(map) => map.naxes(),
            Mapping::Win(map) => map.naxes(),
            Mapping::Perm(map) => map.nin(),
            Mapping::Tran(map) => map.nin(),
            Mapping::Compound(map) => map.nin(),
        }
    }

    /// Number of output axes.
    pub fn nout(&self) -> usize {
        match self {
            Mapping::Unit(map) => map.naxes(),
            Mapping::Zoom(map) => map.naxes(),
            Mapping::Shift(map) => map.naxes(),
            Mapping::Win(map) => map.naxes(),
            Mapping::Perm(map) => map.nout(),
            Mapping::Tran(map) => map.nout(),
            Mapping::Compound(map) => map.nout(),
        }
    }

    /// The variant name, e.g. `"ZoomMap"` or `"CompoundMap"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Mapping::Unit(_) => "UnitMap",
            Mapping::Zoom(_) => "ZoomMap",
            Mapping::Shift(_) => "ShiftMap",
            Mapping::Win(_) => "WinMap",
            Mapping::Perm(_) => "PermMap",
            Mapping::Tran(_) => "TranMap",
            Mapping::Compound(_) => "CompoundMap",
        }
    }

    /// True iff every transform in the tree defines an inverse.
    pub fn is_invertible(&self) -> bool {
        let mut pending = vec![self];
        while let Some(map) = pending.pop() {
            match map {
                Mapping::Unit(_) | Mapping::Zoom(_) | Mapping::Shift(_) => {}
                Mapping::Win(win) => {
                    if !win.is_invertible() {
                        return false;
                    }
                }
                Mapping::Perm(perm) => {
                    if !perm.is_invertible() {
                        return false;
                    }
                }
                Mapping::Tran(tran) => {
                    pending.push(tran.forward());
                    pending.push(tran.inverse());
                }
                Mapping::Compound(compound) => {
                    pending.push(compound.first());
                    pending.push(compound.second());
                }
            }
        }
        true
    }

    /// Transforms each point from the input space to the output space.
    ///
    /// Fails with [`MapError::DimensionMismatch`] if the supplied points do
    /// not have `nin` axes.
    pub fn apply(&self, points: &PointSet) -> MapResult<PointSet> {
        if points.naxes() != self.nin() {
            return Err(MapError::DimensionMismatch {
                context: "applying mapping forward".to_string(),
                expected: self.nin(),
                actual: points.naxes(),
            });
        }

        Ok(evaluate(self, points.clone(), Direction::Forward))
    }

    /// Transforms each point from the output space back to the input space.
    ///
    /// Fails with [`MapError::NotInvertible`] unless the whole tree is
    /// invertible.
    pub fn apply_inverse(&self, points: &PointSet) -> MapResult<PointSet> {
        if !self.is_invertible() {
            return Err(MapError::NotInvertible {
                nin: self.nin(),
                nout: self.nout(),
            });
        }
        if points.naxes() != self.nout() {
            return Err(MapError::DimensionMismatch {
                context: "applying mapping inverse".to_string(),
                expected: self.nout(),
                actual: points.naxes(),
            });
        }

        Ok(evaluate(self, points.clone(), Direction::Inverse))
    }

    /// Returns a new mapping with the input and output roles swapped.
    ///
    /// Series children swap and reverse, parallel children invert in place.
    pub fn invert(&self) -> MapResult<Mapping> {
        if !self.is_invertible() {
            return Err(MapError::NotInvertible {
                nin: self.nin(),
                nout: self.nout(),
            });
        }

        enum Visit<'a> {
            Node(&'a Mapping),
            Combine(MapMode),
            CombineTran,
        }

        let mut visits = vec![Visit::Node(self)];
        let mut built: Vec<Mapping> = Vec::new();

        while let Some(visit) = visits.pop() {
            match visit {
                Visit::Node(map) => match map {
                    Mapping::Unit(unit) => built.push(Mapping::Unit(unit.inverted())),
                    Mapping::Zoom(zoom) => built.push(Mapping::Zoom(zoom.inverted())),
                    Mapping::Shift(shift) => built.push(Mapping::Shift(shift.inverted())),
                    Mapping::Win(win) => built.push(Mapping::Win(win.inverted())),
                    Mapping::Perm(perm) => built.push(Mapping::Perm(perm.inverted())),
                    Mapping::Tran(tran) => {
                        visits.push(Visit::CombineTran);
                        visits.push(Visit::Node(tran.forward()));
                        visits.push(Visit::Node(tran.inverse()));
                    }
                    Mapping::Compound(compound) => {
                        visits.push(Visit::Combine(compound.mode()));
                        visits.push(Visit::Node(compound.first()));
                        visits.push(Visit::Node(compound.second()));
                    }
                },
                Visit::Combine(mode) => {
                    let first_inv = built.pop().expect("inversion stack underflow");
                    let second_inv = built.pop().expect("inversion stack underflow");
                    let compound = match mode {
                        MapMode::Series => CompoundMap::new(second_inv, first_inv, MapMode::Series),
                        MapMode::Parallel => {
                            CompoundMap::new(first_inv, second_inv, MapMode::Parallel)
                        }
                    }
                    .expect("inverted children preserve compound dimensions");
                    built.push(Mapping::Compound(compound));
                }
                Visit::CombineTran => {
                    let forward_inv = built.pop().expect("inversion stack underflow");
                    let inverse_inv = built.pop().expect("inversion stack underflow");
                    let tran = TranMap::new(inverse_inv, forward_inv)
                        .expect("inverted halves preserve spliced dimensions");
                    built.push(Mapping::Tran(tran));
                }
            }
        }

        let inverted = built.pop().expect("inversion produced no mapping");
        assert!(built.is_empty(), "inversion left extra mappings on the stack");
        Ok(inverted)
    }

    /// Composes `self` in series with `second`: `self` first, `second` after.
    pub fn then(self, second: Mapping) -> MapResult<Mapping> {
        Ok(Mapping::Compound(CompoundMap::new(
            self,
            second,
            MapMode::Series,
        )?))
    }

    /// Composes `self` in parallel with `second`: `self` transforms the
    /// leading axes, `second` the trailing ones.
    pub fn over(self, second: Mapping) -> Mapping {
        Mapping::Compound(
            CompoundMap::new(self, second, MapMode::Parallel)
                .expect("parallel composition has no precondition"),
        )
    }

    /// Deep copy: the result shares no children with `self`.
    ///
    /// Plain `clone` keeps the shared children; use this before rebuilding a
    /// tree whose pieces are also held elsewhere.
    pub fn copy(&self) -> Mapping {
        enum Visit<'a> {
            Node(&'a Mapping),
            Combine(MapMode),
            CombineTran,
        }

        let mut visits = vec![Visit::Node(self)];
        let mut built: Vec<Mapping> = Vec::new();

        while let Some(visit) = visits.pop() {
            match visit {
                Visit::Node(map) => match map {
                    Mapping::Tran(tran) => {
                        visits.push(Visit::CombineTran);
                        visits.push(Visit::Node(tran.inverse()));
                        visits.push(Visit::Node(tran.forward()));
                    }
                    Mapping::Compound(compound) => {
                        visits.push(Visit::Combine(compound.mode()));
                        visits.push(Visit::Node(compound.second()));
                        visits.push(Visit::Node(compound.first()));
                    }
                    leaf => built.push(leaf.clone()),
                },
                Visit::Combine(mode) => {
                    let second = built.pop().expect("copy stack underflow");
                    let first = built.pop().expect("copy stack underflow");
                    let compound = CompoundMap::new(first, second, mode)
                        .expect("copied children preserve compound dimensions");
                    built.push(Mapping::Compound(compound));
                }
                Visit::CombineTran => {
                    let inverse = built.pop().expect("copy stack underflow");
                    let forward = built.pop().expect("copy stack underflow");
                    let tran = TranMap::new(forward, inverse)
                        .expect("copied halves preserve spliced dimensions");
                    built.push(Mapping::Tran(tran));
                }
            }
        }

        let copied = built.pop().expect("copy produced no mapping");
        assert!(built.is_empty(), "copy left extra mappings on the stack");
        copied
    }

    /// True iff [`Mapping::simplify`] would return the tree unchanged.
    pub fn is_simple(&self) -> bool {
        self.simplify() == *self
    }

    pub fn to_yaml(&self) -> String {
        serde_yml::to_string(self)
            .expect("Failed to serialize mapping to YAML")
            .normalize()
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Mapping> {
        let mapping: Mapping = serde_yml::from_str(yaml)?;

        mapping.validate()?;

        Ok(mapping)
    }

    pub fn from_yaml_file(path: &str) -> anyhow::Result<Mapping> {
        let yaml = std::fs::read_to_string(path)?;
        Mapping::from_yaml(&yaml)
    }

    /// Re-checks structural invariants, for trees built by deserialization.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut pending = vec![self];
        while let Some(map) = pending.pop() {
            match map {
                Mapping::Unit(unit) => unit.validate()?,
                Mapping::Zoom(zoom) => zoom.validate()?,
                Mapping::Shift(shift) => shift.validate()?,
                Mapping::Win(win) => win.validate()?,
                Mapping::Perm(perm) => perm.validate()?,
                Mapping::Tran(tran) => {
                    tran.validate_shape()?;
                    pending.push(tran.forward());
                    pending.push(tran.inverse());
                }
                Mapping::Compound(compound) => {
                    compound.validate_shape()?;
                    pending.push(compound.first());
                    pending.push(compound.second());
                }
            }
        }
        Ok(())
    }
}

impl From<UnitMap> for Mapping {
    fn from(map: UnitMap) -> Mapping {
        Mapping::Unit(map)
    }
}

impl From<ZoomMap> for Mapping {
    fn from(map: ZoomMap) -> Mapping {
        Mapping::Zoom(map)
    }
}

impl From<ShiftMap> for Mapping {
    fn from(map: ShiftMap) -> Mapping {
        Mapping::Shift(map)
    }
}

impl From<WinMap> for Mapping {
    fn from(map: WinMap) -> Mapping {
        Mapping::Win(map)
    }
}

impl From<PermMap> for Mapping {
    fn from(map: PermMap) -> Mapping {
        Mapping::Perm(map)
    }
}

impl From<TranMap> for Mapping {
    fn from(map: TranMap) -> Mapping {
        Mapping::Tran(map)
    }
}

impl From<CompoundMap> for Mapping {
    fn from(map: CompoundMap) -> Mapping {
        Mapping::Compound(map)
    }
}

enum Task<'a> {
    /// Evaluate `map` on `input`, leaving the result on the result stack.
    Apply { map: &'a Mapping, input: PointSet },
    /// Pop one result and evaluate `next` on it.
    Feed { next: &'a Mapping },
    /// Pop two results and concatenate them axis-wise.
    Merge,
}

/// Evaluates a mapping tree over a point batch with an explicit work stack,
/// so trees of arbitrary depth never exhaust the call stack.
///
/// Preconditions (checked by the callers): `input.naxes()` matches the root's
/// expected axes for `direction`, and for `Direction::Inverse` the whole tree
/// is invertible.
fn evaluate(root: &Mapping, input: PointSet, direction: Direction) -> PointSet {
    let mut tasks = vec![Task::Apply { map: root, input }];
    let mut results: Vec<PointSet> = Vec::new();

    while let Some(task) = tasks.pop() {
        match task {
            Task::Apply { map, input } => match map {
                Mapping::Unit(unit) => results.push(unit.transform(input, direction)),
                Mapping::Zoom(zoom) => results.push(zoom.transform(input, direction)),
                Mapping::Shift(shift) => results.push(shift.transform(input, direction)),
                Mapping::Win(win) => results.push(win.transform(input, direction)),
                Mapping::Perm(perm) => results.push(perm.transform(input, direction)),
                Mapping::Tran(tran) => {
                    let half = match direction {
                        Direction::Forward => tran.forward(),
                        Direction::Inverse => tran.inverse(),
                    };
                    tasks.push(Task::Apply { map: half, input });
                }
                Mapping::Compound(compound) => match (compound.mode(), direction) {
                    (MapMode::Series, Direction::Forward) => {
                        tasks.push(Task::Feed {
                            next: compound.second(),
                        });
                        tasks.push(Task::Apply {
                            map: compound.first(),
                            input,
                        });
                    }
                    (MapMode::Series, Direction::Inverse) => {
                        tasks.push(Task::Feed {
                            next: compound.first(),
                        });
                        tasks.push(Task::Apply {
                            map: compound.second(),
                            input,
                        });
                    }
                    (MapMode::Parallel, _) => {
                        let split_axis = match direction {
                            Direction::Forward => compound.first().nin(),
                            Direction::Inverse => compound.first().nout(),
                        };
                        let (left, right) = input.split_at(split_axis);
                        tasks.push(Task::Merge);
                        tasks.push(Task::Apply {
                            map: compound.second(),
                            input: right,
                        });
                        tasks.push(Task::Apply {
                            map: compound.first(),
                            input: left,
                        });
                    }
                },
            },
            Task::Feed { next } => {
                let input = results.pop().expect("evaluation result stack underflow");
                tasks.push(Task::Apply { map: next, input });
            }
            Task::Merge => {
                let right = results.pop().expect("evaluation result stack underflow");
                let left = results.pop().expect("evaluation result stack underflow");
                results.push(PointSet::concat(&left, &right));
            }
        }
    }

    let output = results.pop().expect("evaluation produced no result");
    assert!(
        results.is_empty(),
        "evaluation left extra results on the stack"
    );
    trace!(
        "evaluated {} mapping over {} points",
        root.kind(),
        output.len()
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn leaf_shapes() {
        let zoom: Mapping = ZoomMap::new(2, 1.3).into();
        assert_eq!(zoom.nin(), 2);
        assert_eq!(zoom.nout(), 2);
        assert_eq!(zoom.kind(), "ZoomMap");
        assert!(zoom.is_invertible());

        let perm: Mapping = PermMap::new(3, vec![0, 2]).into();
        assert_eq!(perm.nin(), 3);
        assert_eq!(perm.nout(), 2);
        assert!(!perm.is_invertible());
    }

    #[test]
    fn apply_rejects_wrong_axis_count() {
        let zoom: Mapping = ZoomMap::new(2, 1.3).into();
        let points = PointSet::from_flat(3, vec![1.0, 2.0, 3.0]);

        let err = zoom.apply(&points).unwrap_err();
        assert!(matches!(
            err,
            MapError::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn apply_inverse_requires_invertibility() {
        let perm: Mapping = PermMap::new(3, vec![0, 2]).into();
        let points = PointSet::from_flat(2, vec![1.0, 2.0]);

        let err = perm.apply_inverse(&points).unwrap_err();
        assert_eq!(err, MapError::NotInvertible { nin: 3, nout: 2 });
        assert!(perm.invert().is_err());
    }

    #[test]
    fn zoom_inverts_to_reciprocal() -> anyhow::Result<()> {
        let zoom: Mapping = ZoomMap::new(2, 1.3).into();
        let inverse = zoom.invert()?;

        let points = PointSet::from_flat(2, vec![1.0, 3.0, 2.0, 99.0, -6.0, -5.0]);
        let zoomed = zoom.apply(&points)?;
        let back = inverse.apply(&zoomed)?;
        assert!(back.approximately_eq(&points));

        Ok(())
    }

    #[test]
    fn copy_shares_nothing() -> anyhow::Result<()> {
        let tree = Mapping::from(ZoomMap::new(2, 2.0)).then(ShiftMap::new(vec![1.0, 1.0]).into())?;
        let copied = tree.copy();

        assert_eq!(tree, copied);

        let (Mapping::Compound(original), Mapping::Compound(copy)) = (&tree, &copied) else {
            panic!("expected compounds");
        };
        assert!(!Arc::ptr_eq(original.first(), copy.first()));
        assert!(!Arc::ptr_eq(original.second(), copy.second()));

        Ok(())
    }

    #[test]
    fn mode_display_names() {
        assert_eq!(MapMode::Series.to_string(), "series");
        assert_eq!(MapMode::Parallel.to_string(), "parallel");
    }
}
