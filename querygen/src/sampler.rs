use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::{SplitMix64, Xoshiro256PlusPlus};
use scene::geom::CameraSample;

use crate::config::RunConfig;

/// Uniform draw between two endpoints given in either order.
pub fn draw_between<R: Rng + ?Sized>(rng: &mut R, (a, b): (f64, f64)) -> f64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    lo + rng.random::<f64>() * (hi - lo)
}

/// Draws one camera placement from the configured ranges.
pub fn sample<R: Rng + ?Sized>(config: &RunConfig, rng: &mut R) -> CameraSample {
    CameraSample {
        h_angle: draw_between(rng, config.camera_angles_range_h),
        v_angle: draw_between(rng, config.camera_angles_range_v),
        distance: draw_between(rng, config.camera_distance_range),
    }
}

/// Derives independent generators from one run seed.
pub struct SeedStream {
    inner: SplitMix64,
}

impl SeedStream {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: SplitMix64::seed_from_u64(seed),
        }
    }

    pub fn next_rng(&mut self) -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(self.inner.next_u64())
    }
}
