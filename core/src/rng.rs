//! Buffered random source for the Monte Carlo path.
//!
//! RULE: Simulation code never calls a platform RNG directly.
//! All draws come from a FastRng owned by exactly one worker.
//!
//! Each worker's stream is seeded from (master_seed XOR worker_index),
//! mixed through the golden-ratio constant. This means:
//!   - A seeded request is reproducible for a fixed worker count.
//!   - Workers never share a buffer, so no locking on the hot path.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Draws pre-generated per refill.
pub const DEFAULT_BUFFER_LEN: usize = 1_000_000;

/// Uniform [0, 1) draws served from a pre-filled buffer.
pub struct FastRng {
    inner:  Pcg64Mcg,
    buffer: Vec<f64>,
    cursor: usize,
}

impl FastRng {
    pub fn new(seed: u64) -> Self {
        Self::with_capacity(seed, DEFAULT_BUFFER_LEN)
    }

    /// Seeded source with a custom buffer length. Zero is treated as one.
    pub fn with_capacity(seed: u64, capacity: usize) -> Self {
        let mut rng = Self {
            inner:  Pcg64Mcg::seed_from_u64(seed),
            buffer: vec![0.0; capacity.max(1)],
            cursor: 0,
        };
        rng.refill();
        rng
    }

    /// Next uniform draw in [0, 1). Refills the whole buffer when exhausted.
    #[inline]
    pub fn next(&mut self) -> f64 {
        if self.cursor == self.buffer.len() {
            self.refill();
        }
        let value = self.buffer[self.cursor];
        self.cursor += 1;
        value
    }

    /// Uniform slot index in [0, n). `n` must be > 0.
    #[inline]
    pub fn next_index(&mut self, n: usize) -> usize {
        debug_assert!(n > 0, "n must be > 0");
        ((self.next() * n as f64) as usize).min(n - 1)
    }

    fn refill(&mut self) {
        for slot in self.buffer.iter_mut() {
            let bits = self.inner.next_u64();
            *slot = (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64);
        }
        self.cursor = 0;
    }
}

/// Derives one independent FastRng per worker from a single master seed.
pub struct RngBank {
    master_seed: u64,
    capacity:    usize,
}

impl RngBank {
    pub fn new(master_seed: u64, capacity: usize) -> Self {
        Self { master_seed, capacity }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_worker(&self, worker_index: u64) -> FastRng {
        let derived_seed = self.master_seed ^ worker_index.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        FastRng::with_capacity(derived_seed, self.capacity)
    }
}
