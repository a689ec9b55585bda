//! Director configuration.

use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HdfError, Result};

/// Default number of cached schedules per director.
pub const DEFAULT_CACHE_SIZE: i64 = 100;

/// Upper bound on the number of schedules a cache retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCapacity {
    /// Entries are never evicted.
    Unbounded,

    /// At most this many entries are retained.
    Bounded(NonZeroUsize),
}

impl CacheCapacity {
    /// Interprets a raw cache size; zero or negative means unbounded.
    pub fn from_size(size: i64) -> Self {
        usize::try_from(size)
            .ok()
            .and_then(NonZeroUsize::new)
            .map_or(Self::Unbounded, Self::Bounded)
    }

    /// Returns the bound, if any.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(n) => Some(n.get()),
        }
    }
}

impl Default for CacheCapacity {
    fn default() -> Self {
        Self::from_size(DEFAULT_CACHE_SIZE)
    }
}

impl From<i64> for CacheCapacity {
    fn from(size: i64) -> Self {
        Self::from_size(size)
    }
}

/// Settings of an HDF director, as loaded by the embedding tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DirectorConfig {
    /// Number of schedules to cache; zero or negative means unbounded.
    pub schedule_cache_size: i64,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            schedule_cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl DirectorConfig {
    /// Parses a configuration from JSON.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| HdfError::Config(e.to_string()))
    }

    /// Loads a configuration from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| HdfError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_json_str(&content)
    }

    /// Sets the cache size.
    pub fn with_schedule_cache_size(mut self, size: i64) -> Self {
        self.schedule_cache_size = size;
        self
    }

    /// Returns the configured cache capacity.
    pub fn cache_capacity(&self) -> CacheCapacity {
        CacheCapacity::from_size(self.schedule_cache_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_capacity_from_size() {
        assert_eq!(CacheCapacity::from_size(0), CacheCapacity::Unbounded);
        assert_eq!(CacheCapacity::from_size(-5), CacheCapacity::Unbounded);
        assert_eq!(CacheCapacity::from_size(3).limit(), Some(3));
        assert_eq!(CacheCapacity::default().limit(), Some(100));
    }

    #[test]
    fn test_config_defaults_when_field_missing() {
        let config = DirectorConfig::from_json_str("{}").unwrap();
        assert_eq!(config.schedule_cache_size, DEFAULT_CACHE_SIZE);

        let config = DirectorConfig::from_json_str(r#"{"scheduleCacheSize": -1}"#).unwrap();
        assert_eq!(config.cache_capacity(), CacheCapacity::Unbounded);
    }

    #[test]
    fn test_config_rejects_malformed_json() {
        let err = DirectorConfig::from_json_str(r#"{"scheduleCacheSize": "big"}"#).unwrap_err();
        assert!(matches!(err, HdfError::Config(_)));
    }

    #[test]
    fn test_config_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("director.json");
        fs::write(&path, r#"{"scheduleCacheSize": 7}"#).unwrap();

        let config = DirectorConfig::from_path(&path).unwrap();
        assert_eq!(config.cache_capacity().limit(), Some(7));

        let missing = DirectorConfig::from_path(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(HdfError::FileRead { .. })));
    }
}
