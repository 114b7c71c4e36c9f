use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mapping::{MapError, MapMode, MapResult, Mapping};

/// A binary composition node: two child mappings combined in series or in
/// parallel.
///
/// Children are held by shared reference. Composing does not copy them, so
/// the same mapping may sit in several trees at once and stays alive as long
/// as any holder does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompoundMap {
    mode: MapMode,
    first: Arc<Mapping>,
    second: Arc<Mapping>,
    nin: usize,
    nout: usize,
}

impl CompoundMap {
    /// Combines two mappings.
    ///
    /// Series mode requires `first.nout() == second.nin()` and fails with
    /// [`MapError::DimensionMismatch`] otherwise; parallel mode has no
    /// precondition.
    pub fn new(
        first: impl Into<Arc<Mapping>>,
        second: impl Into<Arc<Mapping>>,
        mode: MapMode,
    ) -> MapResult<CompoundMap> {
        let first = first.into();
        let second = second.into();

        let (nin, nout) = match mode {
            MapMode::Series => {
                if first.nout() != second.nin() {
                    return Err(MapError::DimensionMismatch {
                        context: "composing mappings in series".to_string(),
                        expected: first.nout(),
                        actual: second.nin(),
                    });
                }
                (first.nin(), second.nout())
            }
            MapMode::Parallel => (first.nin() + second.nin(), first.nout() + second.nout()),
        };

        debug!(
            "composed {} compound of {} and {}: {} -> {} axes",
            mode,
            first.kind(),
            second.kind(),
            nin,
            nout
        );

        Ok(CompoundMap {
            mode,
            first,
            second,
            nin,
            nout,
        })
    }

    pub fn series(
        first: impl Into<Arc<Mapping>>,
        second: impl Into<Arc<Mapping>>,
    ) -> MapResult<CompoundMap> {
        CompoundMap::new(first, second, MapMode::Series)
    }

    pub fn parallel(
        first: impl Into<Arc<Mapping>>,
        second: impl Into<Arc<Mapping>>,
    ) -> CompoundMap {
        CompoundMap::new(first, second, MapMode::Parallel)
            .expect("parallel composition has no precondition")
    }

    pub fn mode(&self) -> MapMode {
        self.mode
    }

    pub fn is_series(&self) -> bool {
        self.mode == MapMode::Series
    }

    pub fn is_parallel(&self) -> bool {
        self.mode == MapMode::Parallel
    }

    pub fn nin(&self) -> usize {
        self.nin
    }

    pub fn nout(&self) -> usize {
        self.nout
    }

    pub fn first(&self) -> &Arc<Mapping> {
        &self.first
    }

    pub fn second(&self) -> &Arc<Mapping> {
        &self.second
    }

    pub fn into_mapping(self) -> Mapping {
        Mapping::Compound(self)
    }

    /// Checks this node's dimension bookkeeping against its children.
    /// Children are validated separately by the tree walk in
    /// [`Mapping::validate`].
    pub(crate) fn validate_shape(&self) -> anyhow::Result<()> {
        let (nin, nout) = match self.mode {
            MapMode::Series => {
                if self.first.nout() != self.second.nin() {
                    return Err(anyhow::Error::msg(
                        "Series compound children have mismatched dimensions",
                    ));
                }
                (self.first.nin(), self.second.nout())
            }
            MapMode::Parallel => (
                self.first.nin() + self.second.nin(),
                self.first.nout() + self.second.nout(),
            ),
        };
        if (self.nin, self.nout) != (nin, nout) {
            return Err(anyhow::Error::msg(
                "Compound mapping dimensions disagree with its children",
            ));
        }
        Ok(())
    }
}

/// A compound constrained to series mode at the type level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesMap(CompoundMap);

impl SeriesMap {
    /// Composes two mappings in series, validating dimensions up front.
    pub fn new(
        first: impl Into<Arc<Mapping>>,
        second: impl Into<Arc<Mapping>>,
    ) -> MapResult<SeriesMap> {
        Ok(SeriesMap(CompoundMap::series(first, second)?))
    }

    /// Classifies an existing compound, e.g. one read from a channel.
    pub fn from_compound(compound: CompoundMap) -> MapResult<SeriesMap> {
        match compound.mode() {
            MapMode::Series => Ok(SeriesMap(compound)),
            MapMode::Parallel => Err(MapError::ModeMismatch {
                expected: MapMode::Series,
                actual: MapMode::Parallel,
            }),
        }
    }

    pub fn as_compound(&self) -> &CompoundMap {
        &self.0
    }

    pub fn into_compound(self) -> CompoundMap {
        self.0
    }

    pub fn into_mapping(self) -> Mapping {
        Mapping::Compound(self.0)
    }
}

impl Deref for SeriesMap {
    type Target = CompoundMap;

    fn deref(&self) -> &CompoundMap {
        &self.0
    }
}

impl From<SeriesMap> for Mapping {
    fn from(map: SeriesMap) -> Mapping {
        map.into_mapping()
    }
}

/// A compound constrained to parallel mode at the type level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParallelMap(CompoundMap);

impl ParallelMap {
    pub fn new(first: impl Into<Arc<Mapping>>, second: impl Into<Arc<Mapping>>) -> ParallelMap {
        ParallelMap(CompoundMap::parallel(first, second))
    }

    /// Classifies an existing compound, e.g. one read from a channel.
    pub fn from_compound(compound: CompoundMap) -> MapResult<ParallelMap> {
        match compound.mode() {
            MapMode::Parallel => Ok(ParallelMap(compound)),
            MapMode::Series => Err(MapError::ModeMismatch {
                expected: MapMode::Parallel,
                actual: MapMode::Series,
            }),
        }
    }

    pub fn as_compound(&self) -> &CompoundMap {
        &self.0
    }

    pub fn into_compound(self) -> CompoundMap {
        self.0
    }

    pub fn into_mapping(self) -> Mapping {
        Mapping::Compound(self.0)
    }
}

impl Deref for ParallelMap {
    type Target = CompoundMap;

    fn deref(&self) -> &CompoundMap {
        &self.0
    }
}

impl From<ParallelMap> for Mapping {
    fn from(map: ParallelMap) -> Mapping {
        map.into_mapping()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::{ShiftMap, UnitMap, ZoomMap};

    #[test]
    fn series_dimension_bookkeeping() -> anyhow::Result<()> {
        let perm = crate::maps::PermMap::new(3, vec![0, 2]);
        let zoom = ZoomMap::new(2, 2.0);

        let compound = CompoundMap::series(Mapping::from(perm), Mapping::from(zoom))?;
        assert_eq!(compound.nin(), 3);
        assert_eq!(compound.nout(), 2);
        assert!(compound.is_series());

        Ok(())
    }

    #[test]
    fn series_rejects_mismatched_dimensions() {
        let zoom2 = Mapping::from(ZoomMap::new(2, 2.0));
        let zoom3 = Mapping::from(ZoomMap::new(3, 2.0));

        let err = CompoundMap::series(zoom2, zoom3).unwrap_err();
        assert_eq!(
            err,
            MapError::DimensionMismatch {
                context: "composing mappings in series".to_string(),
                expected: 2,
                actual: 3,
            }
        );
    }

    #[test]
    fn parallel_sums_dimensions() {
        let zoom = Mapping::from(ZoomMap::new(2, 2.0));
        let shift = Mapping::from(ShiftMap::new(vec![1.0, 2.0, 3.0]));

        let compound = CompoundMap::parallel(zoom, shift);
        assert_eq!(compound.nin(), 5);
        assert_eq!(compound.nout(), 5);
        assert!(compound.is_parallel());
    }

    #[test]
    fn children_are_shared() -> anyhow::Result<()> {
        let shared = Arc::new(Mapping::from(UnitMap::new(2)));

        let series = CompoundMap::series(shared.clone(), shared.clone())?;
        let parallel = CompoundMap::parallel(shared.clone(), shared.clone());

        assert!(Arc::ptr_eq(series.first(), &shared));
        assert!(Arc::ptr_eq(parallel.second(), &shared));

        Ok(())
    }

    #[test]
    fn typed_wrappers_reject_wrong_mode() -> anyhow::Result<()> {
        let series = CompoundMap::series(
            Mapping::from(UnitMap::new(2)),
            Mapping::from(ZoomMap::new(2, 0.5)),
        )?;
        let parallel = CompoundMap::parallel(
            Mapping::from(UnitMap::new(2)),
            Mapping::from(ZoomMap::new(2, 0.5)),
        );

        assert!(SeriesMap::from_compound(series.clone()).is_ok());
        assert!(ParallelMap::from_compound(parallel.clone()).is_ok());

        let err = SeriesMap::from_compound(parallel).unwrap_err();
        assert_eq!(err.to_string(), "Compound mapping is in parallel");

        let err = ParallelMap::from_compound(series).unwrap_err();
        assert_eq!(err.to_string(), "Compound mapping is in series");

        Ok(())
    }
}
