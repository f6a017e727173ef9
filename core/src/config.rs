use crate::error::{GachaError, GachaResult};
use serde::{Deserialize, Serialize};

/// Largest standard top-rarity pool any banner may declare.
pub const MAX_STANDARD_TOP: usize = 8;
/// Largest standard secondary-rarity character pool any banner may declare.
pub const MAX_STANDARD_SECONDARY: usize = 48;
/// Copies 2..=DUPE_CAP pay the repeat rate; later copies pay the capped rate.
pub const DUPE_CAP: u32 = 7;

// ── Engine configuration ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Monte Carlo trials for character pools.
    pub character_trials: usize,
    /// Monte Carlo trials for every other pool.
    pub equipment_trials: usize,
    /// Worker count. 0 = one per available core.
    pub workers: usize,
    /// Master seed. None = fresh entropy per request.
    pub seed: Option<u64>,
    /// Draws pre-generated per random-buffer refill.
    pub rng_buffer_len: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            character_trials: 50_000,
            equipment_trials: 25_000,
            workers:          0,
            seed:             None,
            rng_buffer_len:   crate::rng::DEFAULT_BUFFER_LEN,
        }
    }
}

impl SimConfig {
    /// Load from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Seeded, single-worker, small-buffer config for tests.
    pub fn default_test() -> Self {
        Self {
            workers:        1,
            seed:           Some(0x5EED_CAFE),
            rng_buffer_len: 65_536,
            ..Self::default()
        }
    }

    pub fn trials_for(&self, kind: PoolKind) -> usize {
        match kind {
            PoolKind::Character => self.character_trials,
            PoolKind::Equipment => self.equipment_trials,
        }
    }

    /// Resolved worker count, never zero.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }

    pub fn validate(&self) -> GachaResult<()> {
        if self.character_trials == 0 || self.equipment_trials == 0 {
            return Err(GachaError::InvalidConfig("trial counts must be positive".into()));
        }
        if self.rng_buffer_len == 0 {
            return Err(GachaError::InvalidConfig("rng_buffer_len must be positive".into()));
        }
        Ok(())
    }
}

// ── Banner constants ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    /// Character banners: duplicate-tracked returns, larger sample.
    Character,
    /// Weapon / light cone / W-engine banners.
    Equipment,
}

/// Flat base rate, then a linear ramp reaching 1.0 at hard pity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SoftPityCurve {
    pub base_rate:  f64,
    /// First 1-based pull index above the base rate.
    pub ramp_start: u32,
    pub ramp_step:  f64,
    pub hard_pity:  u32,
}

impl SoftPityCurve {
    /// Top-rarity probability for the pull made with `pity` pulls already
    /// spent since the last top drop.
    pub fn probability(&self, pity: u32) -> f64 {
        let pull = pity + 1;
        if pull >= self.hard_pity {
            1.0
        } else if pull < self.ramp_start {
            self.base_rate
        } else {
            let ramp = self.base_rate + f64::from(pull - (self.ramp_start - 1)) * self.ramp_step;
            ramp.min(1.0)
        }
    }
}

/// The banner's auxiliary counter dimension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CounterRule {
    None,
    /// Epitomized path: each loss adds a point; at `threshold` points the next
    /// top drop is the target. Any win clears the points.
    FatePoint { cardinality: u8, threshold: u8 },
    /// Consecutive unguaranteed losses. Persists across targets.
    LossStreak {
        cardinality:   u8,
        forced_win_at: Option<u8>,
        bonus_chance:  f64,
    },
}

impl CounterRule {
    pub fn cardinality(&self) -> usize {
        match *self {
            Self::None => 1,
            Self::FatePoint { cardinality, .. } | Self::LossStreak { cardinality, .. } => {
                usize::from(cardinality)
            }
        }
    }

    /// True when the counter value survives a win into the next target.
    pub fn carries_over(&self) -> bool {
        matches!(self, Self::LossStreak { .. })
    }

    pub fn forces_win(&self, counter: u8) -> bool {
        match *self {
            Self::None => false,
            Self::FatePoint { threshold, .. } => counter >= threshold,
            Self::LossStreak { forced_win_at, .. } => forced_win_at.is_some_and(|t| counter >= t),
        }
    }

    pub fn bonus_chance(&self) -> f64 {
        match *self {
            Self::LossStreak { bonus_chance, .. } => bonus_chance,
            _ => 0.0,
        }
    }

    pub fn after_loss(&self, guaranteed: bool, counter: u8) -> u8 {
        match *self {
            Self::None => 0,
            Self::FatePoint { cardinality, .. } => (counter + 1).min(cardinality - 1),
            Self::LossStreak { cardinality, .. } => {
                if guaranteed {
                    counter
                } else {
                    (counter + 1).min(cardinality - 1)
                }
            }
        }
    }

    pub fn after_win(&self, guaranteed: bool, counter: u8) -> u8 {
        match *self {
            Self::LossStreak { .. } if guaranteed => counter,
            _ => 0,
        }
    }
}

/// Payout per copy count: first copy, copies 2..=DUPE_CAP, later copies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DupeTable {
    pub first:  f64,
    pub repeat: f64,
    pub capped: f64,
}

impl DupeTable {
    pub const fn new(first: f64, repeat: f64, capped: f64) -> Self {
        Self { first, repeat, capped }
    }

    /// `copies` counts the copy just obtained, so it is at least 1.
    pub fn payout(&self, copies: u32) -> f64 {
        match copies {
            0 | 1 => self.first,
            c if c <= DUPE_CAP => self.repeat,
            _ => self.capped,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopPayout {
    Flat { value: f64 },
    Collected {
        featured:      DupeTable,
        standard:      DupeTable,
        standard_pool: usize,
    },
}

/// Secondary-rarity (4-star tier) sub-system. Simulation only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SecondaryConfig {
    pub base_rate:                f64,
    pub featured_share:           f64,
    pub featured_value:           f64,
    pub featured_full_copy_value: f64,
    /// Share of off-featured drops that are standard characters.
    pub character_share:          f64,
    pub standard_characters:      usize,
    pub character_dupes:          DupeTable,
    /// Payout for an off-featured non-character drop.
    pub other_value:              f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BannerConfig {
    pub game:       String,
    pub pool:       String,
    pub kind:       PoolKind,
    pub curve:      SoftPityCurve,
    /// Featured share of an unguaranteed top drop, before any bonus chance.
    pub win_rate:   f64,
    pub counter:    CounterRule,
    pub top_payout: TopPayout,
    pub secondary:  SecondaryConfig,
}

const CHARACTER_CURVE: SoftPityCurve = SoftPityCurve {
    base_rate:  0.006,
    ramp_start: 74,
    ramp_step:  0.06,
    hard_pity:  90,
};

impl BannerConfig {
    pub fn key(&self) -> String {
        crate::types::banner_key(&self.game, &self.pool)
    }

    pub fn genshin_character() -> Self {
        Self {
            game:       "genshin".into(),
            pool:       "character".into(),
            kind:       PoolKind::Character,
            curve:      CHARACTER_CURVE,
            win_rate:   0.5,
            counter:    CounterRule::LossStreak {
                cardinality:   4,
                forced_win_at: Some(3),
                bonus_chance:  0.00018,
            },
            top_payout: TopPayout::Collected {
                featured:      DupeTable::new(10.0, 10.0, 25.0),
                standard:      DupeTable::new(0.0, 10.0, 25.0),
                standard_pool: 7,
            },
            secondary:  SecondaryConfig {
                base_rate:                0.051,
                featured_share:           0.5,
                featured_value:           2.0,
                featured_full_copy_value: 5.0,
                character_share:          39.0 / 57.0,
                standard_characters:      39,
                character_dupes:          DupeTable::new(0.0, 2.0, 5.0),
                other_value:              2.0,
            },
        }
    }

    pub fn genshin_weapon() -> Self {
        Self {
            game:       "genshin".into(),
            pool:       "weapon".into(),
            kind:       PoolKind::Equipment,
            curve:      SoftPityCurve { base_rate: 0.007, ramp_start: 64, ramp_step: 0.07, hard_pity: 80 },
            win_rate:   0.375,
            counter:    CounterRule::FatePoint { cardinality: 3, threshold: 2 },
            top_payout: TopPayout::Flat { value: 10.0 },
            secondary:  SecondaryConfig {
                base_rate:                0.051,
                featured_share:           0.75,
                featured_value:           2.0,
                featured_full_copy_value: 2.0,
                character_share:          39.0 / 57.0,
                standard_characters:      39,
                character_dupes:          DupeTable::new(0.0, 2.0, 5.0),
                other_value:              2.0,
            },
        }
    }

    pub fn hsr_character() -> Self {
        Self {
            game:       "hsr".into(),
            pool:       "character".into(),
            kind:       PoolKind::Character,
            curve:      CHARACTER_CURVE,
            win_rate:   0.5625,
            counter:    CounterRule::LossStreak {
                cardinality:   4,
                forced_win_at: None,
                bonus_chance:  0.0,
            },
            top_payout: TopPayout::Collected {
                featured:      DupeTable::new(40.0, 40.0, 100.0),
                standard:      DupeTable::new(0.0, 40.0, 100.0),
                standard_pool: 7,
            },
            secondary:  SecondaryConfig {
                base_rate:                0.051,
                featured_share:           0.5,
                featured_value:           8.0,
                featured_full_copy_value: 20.0,
                character_share:          22.0 / 51.0,
                standard_characters:      22,
                character_dupes:          DupeTable::new(0.0, 8.0, 20.0),
                other_value:              8.0,
            },
        }
    }

    pub fn hsr_lightcone() -> Self {
        Self {
            game:       "hsr".into(),
            pool:       "lightcone".into(),
            kind:       PoolKind::Equipment,
            curve:      SoftPityCurve { base_rate: 0.008, ramp_start: 66, ramp_step: 0.08, hard_pity: 80 },
            win_rate:   0.75,
            counter:    CounterRule::None,
            top_payout: TopPayout::Flat { value: 40.0 },
            secondary:  SecondaryConfig {
                base_rate:                0.066,
                featured_share:           0.75,
                featured_value:           8.0,
                featured_full_copy_value: 8.0,
                character_share:          22.0 / 51.0,
                standard_characters:      22,
                character_dupes:          DupeTable::new(0.0, 8.0, 20.0),
                other_value:              8.0,
            },
        }
    }

    pub fn zzz_character() -> Self {
        Self {
            game:       "zzz".into(),
            pool:       "character".into(),
            kind:       PoolKind::Character,
            curve:      CHARACTER_CURVE,
            win_rate:   0.5,
            counter:    CounterRule::None,
            top_payout: TopPayout::Collected {
                featured:      DupeTable::new(0.0, 40.0, 100.0),
                standard:      DupeTable::new(0.0, 40.0, 100.0),
                standard_pool: 6,
            },
            secondary:  SecondaryConfig {
                base_rate:                0.094,
                featured_share:           0.5,
                featured_value:           8.0,
                featured_full_copy_value: 20.0,
                character_share:          7.05 / (7.05 + 2.35),
                standard_characters:      12,
                character_dupes:          DupeTable::new(0.0, 8.0, 20.0),
                other_value:              8.0,
            },
        }
    }

    pub fn zzz_weapon() -> Self {
        Self {
            game:       "zzz".into(),
            pool:       "weapon".into(),
            kind:       PoolKind::Equipment,
            curve:      SoftPityCurve { base_rate: 0.01, ramp_start: 65, ramp_step: 0.061875, hard_pity: 80 },
            win_rate:   0.75,
            counter:    CounterRule::None,
            top_payout: TopPayout::Flat { value: 40.0 },
            secondary:  SecondaryConfig {
                base_rate:                0.15,
                featured_share:           0.75,
                featured_value:           8.0,
                featured_full_copy_value: 8.0,
                character_share:          1.875 / 15.0,
                standard_characters:      12,
                character_dupes:          DupeTable::new(0.0, 8.0, 20.0),
                other_value:              8.0,
            },
        }
    }

    /// All built-in banners, in registry order.
    pub fn builtin() -> Vec<Self> {
        vec![
            Self::genshin_character(),
            Self::genshin_weapon(),
            Self::hsr_character(),
            Self::hsr_lightcone(),
            Self::zzz_character(),
            Self::zzz_weapon(),
        ]
    }

    pub fn validate(&self) -> GachaResult<()> {
        let fail = |reason: String| Err(GachaError::InvalidConfig(format!("{}: {reason}", self.key())));

        let curve = &self.curve;
        if curve.hard_pity == 0 || curve.ramp_start == 0 || curve.ramp_start > curve.hard_pity {
            return fail(format!("bad pity breakpoints {}..{}", curve.ramp_start, curve.hard_pity));
        }
        if !(0.0..1.0).contains(&curve.base_rate) || curve.ramp_step < 0.0 {
            return fail("soft-pity rates out of range".into());
        }
        if !(0.0..=1.0).contains(&self.win_rate) {
            return fail(format!("win rate {} outside [0, 1]", self.win_rate));
        }
        match self.counter {
            CounterRule::None => {}
            CounterRule::FatePoint { cardinality, threshold } => {
                if cardinality == 0 || threshold >= cardinality {
                    return fail("fate-point threshold must be below cardinality".into());
                }
            }
            CounterRule::LossStreak { cardinality, forced_win_at, bonus_chance } => {
                if cardinality == 0 || forced_win_at.is_some_and(|t| t >= cardinality) {
                    return fail("loss-streak forced win must be below cardinality".into());
                }
                if !(0.0..=1.0).contains(&bonus_chance) {
                    return fail("bonus chance outside [0, 1]".into());
                }
            }
        }
        if let TopPayout::Collected { standard_pool, .. } = self.top_payout {
            if standard_pool == 0 || standard_pool > MAX_STANDARD_TOP {
                return fail(format!("standard top pool size {standard_pool} unsupported"));
            }
        }
        let secondary = &self.secondary;
        if secondary.standard_characters == 0 || secondary.standard_characters > MAX_STANDARD_SECONDARY {
            return fail(format!(
                "standard secondary pool size {} unsupported",
                secondary.standard_characters
            ));
        }
        for share in [secondary.base_rate, secondary.featured_share, secondary.character_share] {
            if !(0.0..=1.0).contains(&share) {
                return fail("secondary rates outside [0, 1]".into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_banners_validate() {
        for banner in BannerConfig::builtin() {
            banner.validate().unwrap();
        }
    }

    #[test]
    fn dupe_table_boundaries() {
        let table = DupeTable::new(0.0, 2.0, 5.0);
        assert_eq!(table.payout(1), 0.0);
        assert_eq!(table.payout(2), 2.0);
        assert_eq!(table.payout(7), 2.0);
        assert_eq!(table.payout(8), 5.0);
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{ "workers": 3 }"#).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.character_trials, 50_000);
        assert_eq!(config.equipment_trials, 25_000);
    }
}
