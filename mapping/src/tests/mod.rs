mod channel_tests;

use rand::prelude::*;

use crate::point_set::PointSet;

pub(crate) fn init_logging() {
    common::log_setup::setup_logging("warn");
}

/// Deterministic batch of points with coordinates in -100..100.
pub(crate) fn random_points(naxes: usize, count: usize, seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let coords = (0..naxes * count)
        .map(|_| rng.random_range(-100.0..100.0))
        .collect();
    PointSet::from_flat(naxes, coords)
}
