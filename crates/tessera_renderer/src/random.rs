//! Random sampling helpers.
//!
//! Every helper takes the generator explicitly so that each render worker
//! can own a private generator. Nothing here touches shared state except
//! [`worker_seed`], which only reads and bumps a global atomic counter.

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_math::Vec3;

/// Golden-ratio increment used to spread consecutive seeds apart.
const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// xorshift-family generators get stuck on an all-zero state.
const NONZERO_FALLBACK_SEED: u64 = 0x2545_f491_4f6c_dd1d;

static SEED_COUNTER: AtomicU64 = AtomicU64::new(0x1234_5678_9abc_def0);

/// SplitMix64 finalizer.
#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(GOLDEN_GAMMA);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Seed for the calling thread's generator.
///
/// Mixes a process-wide counter with the current thread's identity, so two
/// calls never share a seed and results differ from run to run.
pub fn worker_seed() -> u64 {
    let mut seed = SEED_COUNTER.fetch_add(GOLDEN_GAMMA, Ordering::Relaxed);

    let mut hasher = DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    seed ^= hasher.finish();

    match splitmix64(seed) {
        0 => NONZERO_FALLBACK_SEED,
        s => s,
    }
}

/// Fresh generator for one render worker.
pub fn worker_rng() -> SmallRng {
    SmallRng::seed_from_u64(worker_seed())
}

/// Uniform f64 in [0, 1).
#[inline]
pub fn random_f64(rng: &mut dyn RngCore) -> f64 {
    rng.gen::<f64>()
}

/// Uniform f64 in [min, max).
#[inline]
pub fn random_f64_range(rng: &mut dyn RngCore, min: f64, max: f64) -> f64 {
    min + (max - min) * random_f64(rng)
}

/// Vector with each component uniform in [0, 1).
pub fn random_vec3(rng: &mut dyn RngCore) -> Vec3 {
    Vec3::new(random_f64(rng), random_f64(rng), random_f64(rng))
}

/// Vector with each component uniform in [min, max).
pub fn random_vec3_range(rng: &mut dyn RngCore, min: f64, max: f64) -> Vec3 {
    Vec3::new(
        random_f64_range(rng, min, max),
        random_f64_range(rng, min, max),
        random_f64_range(rng, min, max),
    )
}

/// Uniform point strictly inside the unit sphere (rejection sampling).
pub fn random_in_unit_sphere(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = random_vec3_range(rng, -1.0, 1.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Uniform point strictly inside the unit disk in the z = 0 plane.
pub fn random_in_unit_disk(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(
            random_f64_range(rng, -1.0, 1.0),
            random_f64_range(rng, -1.0, 1.0),
            0.0,
        );
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Random direction: a point in the unit sphere pushed out to its surface.
pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = random_in_unit_sphere(rng);
        // Guard the normalization against the (vanishingly rare) origin sample
        if p.length_squared() > 1e-160 {
            return p.normalize();
        }
    }
}
