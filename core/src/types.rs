//! Shared primitive types used across the models, solver and simulator.

/// A pull count. One pull = one wish / warp / signal search.
pub type Pulls = u32;

/// Secondary currency granted by duplicates (starglitter, undying embers, ...).
pub type Returns = f64;

/// Registry key, always `"<game>-<pool>"`.
pub type BannerKey = String;

/// Pulls-since-last secondary drop that forces a secondary-tier drop.
pub const SECONDARY_PITY: u32 = 10;

pub fn banner_key(game: &str, pool: &str) -> BannerKey {
    format!("{game}-{pool}")
}
