//! Application configuration from the environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use quickquery_cache::CacheConfig;
use quickquery_core::constants::*;
use quickquery_core::error::{QuickQueryError, Result};
use quickquery_fetch::FetchConfig;
use quickquery_resolver::{ResolverConfig, SweeperConfig};
use quickquery_store::StoreConfig;

/// Everything needed to wire the tiers together.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub base_url: String,
    pub db_path: PathBuf,
    pub cache_capacity: usize,
    pub freshness_secs: u64,
    pub retention_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            freshness_secs: (DEFAULT_FRESHNESS_WINDOW_MS / 1000) as u64,
            retention_secs: (DEFAULT_RETENTION_WINDOW_MS / 1000) as u64,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads `QUICKQUERY_*` variables.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup. Unset variables
    /// keep their defaults; set but unparsable ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            base_url: lookup("QUICKQUERY_BASE_URL").unwrap_or(defaults.base_url),
            db_path: lookup("QUICKQUERY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            cache_capacity: parse_var(&lookup, "QUICKQUERY_CACHE_CAPACITY")?
                .unwrap_or(defaults.cache_capacity),
            freshness_secs: parse_var(&lookup, "QUICKQUERY_FRESHNESS_SECS")?
                .unwrap_or(defaults.freshness_secs),
            retention_secs: parse_var(&lookup, "QUICKQUERY_RETENTION_SECS")?
                .unwrap_or(defaults.retention_secs),
            sweep_interval_secs: parse_var(&lookup, "QUICKQUERY_SWEEP_INTERVAL_SECS")?
                .unwrap_or(defaults.sweep_interval_secs),
        })
    }

    /// Checks every derived component config.
    pub fn validate(&self) -> Result<()> {
        self.cache().validate()?;
        self.fetch().validate()?;
        self.resolver().validate()?;
        self.sweeper().validate()?;
        Ok(())
    }

    pub fn cache(&self) -> CacheConfig {
        CacheConfig::with_capacity(self.cache_capacity)
    }

    pub fn fetch(&self) -> FetchConfig {
        FetchConfig::new(self.base_url.clone())
    }

    pub fn store(&self) -> StoreConfig {
        StoreConfig::default().with_retention_ms(self.retention_ms())
    }

    pub fn resolver(&self) -> ResolverConfig {
        ResolverConfig::default()
            .with_freshness_ms(secs_to_ms(self.freshness_secs))
            .with_retention_ms(self.retention_ms())
    }

    pub fn sweeper(&self) -> SweeperConfig {
        SweeperConfig {
            interval_seconds: self.sweep_interval_secs,
            retention_window_ms: self.retention_ms(),
            enabled: true,
        }
    }

    fn retention_ms(&self) -> i64 {
        secs_to_ms(self.retention_secs)
    }
}

fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX / 1000).saturating_mul(1000)
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            QuickQueryError::ConfigError(format!("{} has an invalid value: {:?}", name, raw))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.base_url, "https://restcountries.com/");
        assert_eq!(config.db_path, PathBuf::from("quickquery.db"));
        assert_eq!(config.cache_capacity, 1024);
        assert_eq!(config.resolver().freshness_window_ms, 600_000);
        assert_eq!(config.sweeper().retention_window_ms, 1_800_000);
        assert_eq!(config.store().retention_window_ms, 1_800_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("QUICKQUERY_BASE_URL", "http://localhost:8080/"),
            ("QUICKQUERY_DB_PATH", "/tmp/qq/cache.db"),
            ("QUICKQUERY_CACHE_CAPACITY", "16"),
            ("QUICKQUERY_FRESHNESS_SECS", "60"),
            ("QUICKQUERY_RETENTION_SECS", "120"),
            ("QUICKQUERY_SWEEP_INTERVAL_SECS", " 5 "),
        ]))
        .unwrap();

        assert_eq!(config.fetch().base_url, "http://localhost:8080/");
        assert_eq!(config.db_path, PathBuf::from("/tmp/qq/cache.db"));
        assert_eq!(config.cache().capacity, 16);
        assert_eq!(config.resolver().freshness_window_ms, 60_000);
        assert_eq!(config.sweeper().interval_seconds, 5);
        assert!(config.validate().is_ok());
    }

    #[test_case("QUICKQUERY_CACHE_CAPACITY", "lots" ; "non numeric capacity")]
    #[test_case("QUICKQUERY_FRESHNESS_SECS", "-1" ; "negative freshness")]
    #[test_case("QUICKQUERY_SWEEP_INTERVAL_SECS", "" ; "empty interval")]
    fn test_unparsable_values_rejected(name: &str, value: &str) {
        let err = AppConfig::from_lookup(lookup_from(&[(name, value)])).unwrap_err();
        assert!(matches!(err, QuickQueryError::ConfigError(ref msg) if msg.contains(name)));
    }

    #[test_case(&[("QUICKQUERY_CACHE_CAPACITY", "0")] ; "zero capacity")]
    #[test_case(&[("QUICKQUERY_FRESHNESS_SECS", "0")] ; "zero freshness")]
    #[test_case(&[("QUICKQUERY_FRESHNESS_SECS", "3600")] ; "freshness beyond retention")]
    #[test_case(&[("QUICKQUERY_BASE_URL", "ftp://example.com/")] ; "non http base url")]
    #[test_case(&[("QUICKQUERY_SWEEP_INTERVAL_SECS", "0")] ; "zero sweep interval")]
    fn test_invalid_configs(pairs: &[(&str, &str)]) {
        let config = AppConfig::from_lookup(lookup_from(pairs)).unwrap();
        assert!(config.validate().is_err());
    }
}
