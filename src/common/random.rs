//! The random draw source shared by every sampling operation.
//!
//! A single [`SampleRng`] is created by whoever drives the pipeline and passed by mutable
//! reference into each operation, so one seed reproduces an entire calibration run. It is a plain
//! single-owner value: there is no global generator and nothing here is meant to be shared
//! between threads.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The seed used by `SampleRng::default()`
pub const DEFAULT_SEED: u64 = 5489;

/// The draws that the samplers need from a random source.
pub trait DrawSource {
    /// A uniform integer in `[0, n)`. Returns 0 without drawing when `n <= 1`.
    fn uniform_int(&mut self, n: usize) -> usize;

    /// A uniform real in `[0, 1)`
    fn uniform_01(&mut self) -> f64;

    /// A barycentric triple `[b0, b1, b2]`, each non-negative and summing to one, distributed
    /// uniformly over the area of a triangle. This uses the square root transform, so the points
    /// are not biased toward the apex the way independently drawn and normalized weights are.
    fn uniform_barycentric(&mut self) -> [f64; 3] {
        let u = self.uniform_01();
        let v = self.uniform_01();
        let sqrt_u = u.sqrt();

        [1.0 - sqrt_u, sqrt_u * (1.0 - v), sqrt_u * v]
    }
}

/// A seeded, portable pseudo-random generator used for all sampling draws.
#[derive(Clone, Debug)]
pub struct SampleRng {
    inner: ChaCha8Rng,
}

impl SampleRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Default for SampleRng {
    fn default() -> Self {
        Self::from_seed(DEFAULT_SEED)
    }
}

impl DrawSource for SampleRng {
    fn uniform_int(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        self.inner.random_range(0..n)
    }

    fn uniform_01(&mut self) -> f64 {
        self.inner.random::<f64>()
    }
}

/// Lets the generator drive the `rand` sampling helpers directly, from the same stream as the
/// `DrawSource` draws.
impl RngCore for SampleRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.inner.fill_bytes(dst);
    }
}

/// Shuffles a slice in place with a uniformly random permutation (Fisher-Yates), drawing only
/// through `uniform_int` so any draw source can drive it.
///
/// # Arguments
///
/// * `items`: the slice to permute
/// * `draw`: the source of uniform integers
///
/// returns: ()
pub fn shuffle<T, D: DrawSource + ?Sized>(items: &mut [T], draw: &mut D) {
    for i in (1..items.len()).rev() {
        let j = draw.uniform_int(i + 1);
        items.swap(i, j);
    }
}
