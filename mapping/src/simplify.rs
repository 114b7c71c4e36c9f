use tracing::debug;

use crate::compound::CompoundMap;
use crate::mapping::Mapping;
use crate::maps::{ShiftMap, TranMap, UnitMap, ZoomMap};

impl Mapping {
    /// Returns a behaviorally equivalent tree with redundant structure
    /// removed: identity stages dropped from series chains, adjacent zooms
    /// and shifts fused, all-identity parallels collapsed.
    ///
    /// Never changes `nin`, `nout`, or the transform's outputs. Series
    /// spines are flattened with an explicit stack, so chains of arbitrary
    /// depth simplify without call-stack recursion.
    pub fn simplify(&self) -> Mapping {
        match self {
            Mapping::Compound(compound) if compound.is_series() => simplify_series(self),
            Mapping::Compound(compound) => {
                let first = compound.first().simplify();
                let second = compound.second().simplify();
                if let (Mapping::Unit(first_unit), Mapping::Unit(second_unit)) = (&first, &second) {
                    return Mapping::Unit(UnitMap::new(
                        first_unit.naxes() + second_unit.naxes(),
                    ));
                }
                Mapping::Compound(CompoundMap::parallel(first, second))
            }
            Mapping::Tran(tran) => {
                let forward = tran.forward().simplify();
                let inverse = tran.inverse().simplify();
                Mapping::Tran(
                    TranMap::new(forward, inverse).expect("simplification preserves shapes"),
                )
            }
            leaf => leaf.clone(),
        }
    }
}

fn simplify_series(root: &Mapping) -> Mapping {
    // Flatten the series spine left to right.
    let mut stages: Vec<&Mapping> = Vec::new();
    let mut pending = vec![root];
    while let Some(map) = pending.pop() {
        match map {
            Mapping::Compound(compound) if compound.is_series() => {
                pending.push(compound.second());
                pending.push(compound.first());
            }
            stage => stages.push(stage),
        }
    }
    let stage_count = stages.len();

    let mut fused: Vec<Mapping> = Vec::new();
    'stages: for stage in stages {
        let mut stage = stage.simplify();
        if matches!(stage, Mapping::Unit(_)) {
            continue;
        }
        while let Some(fusion) = fuse_pair(fused.last(), &stage) {
            fused.pop();
            match fusion {
                Some(merged) => stage = merged,
                None => continue 'stages,
            }
        }
        fused.push(stage);
    }

    if fused.len() != stage_count {
        debug!(
            "simplified a series chain of {} stages down to {}",
            stage_count,
            fused.len().max(1)
        );
    }

    let mut remaining = fused.into_iter();
    let Some(mut result) = remaining.next() else {
        // Everything cancelled; the chain is the identity.
        return Mapping::Unit(UnitMap::new(root.nin()));
    };
    for stage in remaining {
        result = Mapping::Compound(
            CompoundMap::series(result, stage).expect("simplified stages preserve dimensions"),
        );
    }
    result
}

/// Fuses two adjacent series stages when they collapse into one transform.
/// `Some(None)` means the pair cancels to the identity.
fn fuse_pair(prev: Option<&Mapping>, next: &Mapping) -> Option<Option<Mapping>> {
    match (prev?, next) {
        (Mapping::Zoom(prev), Mapping::Zoom(next)) => {
            let factor = prev.factor() * next.factor();
            if factor == 1.0 {
                Some(None)
            } else {
                Some(Some(Mapping::Zoom(ZoomMap::new(prev.naxes(), factor))))
            }
        }
        (Mapping::Shift(prev), Mapping::Shift(next)) => {
            let offsets: Vec<f64> = prev
                .offsets()
                .iter()
                .zip(next.offsets().iter())
                .map(|(a, b)| a + b)
                .collect();
            if offsets.iter().all(|&offset| offset == 0.0) {
                Some(None)
            } else {
                Some(Some(Mapping::Shift(ShiftMap::new(offsets))))
            }
        }
        _ => None,
    }
}
