//! Process-wide banner registry, keyed by `"<game>-<pool>"`.

use crate::{
    banner::Banner,
    config::BannerConfig,
    error::{GachaError, GachaResult},
};
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub struct BannerRegistry {
    banners: BTreeMap<String, Banner>,
}

impl BannerRegistry {
    pub fn from_configs(configs: Vec<BannerConfig>) -> GachaResult<Self> {
        let mut banners = BTreeMap::new();
        for config in configs {
            let key = config.key();
            if banners.insert(key.clone(), Banner::new(config)?).is_some() {
                return Err(GachaError::InvalidConfig(format!("duplicate banner '{key}'")));
            }
        }
        Ok(Self { banners })
    }

    pub fn builtin() -> GachaResult<Self> {
        Self::from_configs(BannerConfig::builtin())
    }

    pub fn get(&self, key: &str) -> GachaResult<&Banner> {
        self.banners
            .get(key)
            .ok_or_else(|| GachaError::UnknownBanner { key: key.to_string() })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.banners.keys().map(String::as_str)
    }

    pub fn banners(&self) -> impl Iterator<Item = &Banner> {
        self.banners.values()
    }

    /// Solve every banner's tables now instead of on first query.
    pub fn warm_up(&self) -> GachaResult<()> {
        for banner in self.banners() {
            banner.tables()?;
        }
        Ok(())
    }
}

static GLOBAL: OnceLock<Result<BannerRegistry, String>> = OnceLock::new();

/// The built-in registry, created on first use and never dropped.
pub fn global() -> GachaResult<&'static BannerRegistry> {
    GLOBAL
        .get_or_init(|| BannerRegistry::builtin().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|reason| GachaError::InvalidConfig(reason.clone()))
}
