//! Per-run mutable state: the pull counters and the duplicate collection.

use crate::config::{MAX_STANDARD_SECONDARY, MAX_STANDARD_TOP};
use serde::{Deserialize, Serialize};

/// Counters carried pull-to-pull and across successive targets of one run.
///
/// `counter` is the banner's auxiliary dimension: fate points on fate-point
/// banners, the loss streak on loss-streak banners, always 0 otherwise.
/// Only the owning banner's transition rules read or write it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullState {
    pub pity:           u32,
    pub pity4:          u32,
    pub is_guaranteed:  bool,
    pub is_guaranteed4: bool,
    pub counter:        u8,
}

impl PullState {
    pub fn new(pity: u32, is_guaranteed: bool, counter: u8) -> Self {
        Self {
            pity,
            is_guaranteed,
            counter,
            ..Self::default()
        }
    }

    /// Copy for a fresh simulated run: the secondary-tier fields are
    /// simulation-only and always start cleared.
    pub fn for_simulation(&self) -> Self {
        Self {
            pity4: 0,
            is_guaranteed4: false,
            ..*self
        }
    }
}

/// Owned copies per item slot. Created per simulated run, never shared.
#[derive(Debug, Clone)]
pub struct Collection {
    pub featured_top:       u32,
    pub standard_top:       [u32; MAX_STANDARD_TOP],
    pub standard_secondary: [u32; MAX_STANDARD_SECONDARY],
}

impl Default for Collection {
    fn default() -> Self {
        Self {
            featured_top:       0,
            standard_top:       [0; MAX_STANDARD_TOP],
            standard_secondary: [0; MAX_STANDARD_SECONDARY],
        }
    }
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more featured top-rarity copy; returns the new count.
    pub fn add_featured_top(&mut self) -> u32 {
        self.featured_top += 1;
        self.featured_top
    }

    pub fn add_standard_top(&mut self, slot: usize) -> u32 {
        self.standard_top[slot] += 1;
        self.standard_top[slot]
    }

    pub fn add_standard_secondary(&mut self, slot: usize) -> u32 {
        self.standard_secondary[slot] += 1;
        self.standard_secondary[slot]
    }
}
