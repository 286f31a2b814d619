//! Store construction options
//!
//! Loadable from a JSON file; every field has a default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use crate::history::{RetentionPolicy, REFERENCE_STUB_COST};

/// Default maximum number of retained commits
pub const DEFAULT_MAX_COMMIT_COUNT: usize = 10_000;
/// Default history byte budget (50 MiB)
pub const DEFAULT_MAX_HISTORY_BYTES: u64 = 50 * 1024 * 1024;
/// Default per-value threshold above which history keeps a reference stub (100 KiB)
pub const DEFAULT_PER_VALUE_SIZE_LIMIT: u64 = 100 * 1024;
/// Default length of a commit's value preview
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 120;

/// Construction options for a store instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Count limit of the commit log
    #[serde(default = "default_max_commit_count")]
    pub max_commit_count: usize,

    /// Byte budget of the commit log (sum of stored sizes)
    #[serde(default = "default_max_history_bytes")]
    pub max_history_bytes: u64,

    /// Values larger than this are recorded as reference stubs
    #[serde(default = "default_per_value_size_limit")]
    pub per_value_size_limit: u64,

    /// Denials raise `AccessDenied` instead of degrading to absent / no-op
    #[serde(default)]
    pub strict_access_mode: bool,

    /// Maximum characters in a commit's value summary
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,
}

fn default_max_commit_count() -> usize {
    DEFAULT_MAX_COMMIT_COUNT
}
fn default_max_history_bytes() -> u64 {
    DEFAULT_MAX_HISTORY_BYTES
}
fn default_per_value_size_limit() -> u64 {
    DEFAULT_PER_VALUE_SIZE_LIMIT
}
fn default_summary_max_chars() -> usize {
    DEFAULT_SUMMARY_MAX_CHARS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_commit_count: DEFAULT_MAX_COMMIT_COUNT,
            max_history_bytes: DEFAULT_MAX_HISTORY_BYTES,
            per_value_size_limit: DEFAULT_PER_VALUE_SIZE_LIMIT,
            strict_access_mode: false,
            summary_max_chars: DEFAULT_SUMMARY_MAX_CHARS,
        }
    }
}

impl StoreConfig {
    /// Load and validate options from a JSON file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: StoreConfig = serde_json::from_str(&content)
            .map_err(|e| StoreError::InvalidConfig(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_commit_count(mut self, count: usize) -> Self {
        self.max_commit_count = count;
        self
    }

    pub fn with_max_history_bytes(mut self, bytes: u64) -> Self {
        self.max_history_bytes = bytes;
        self
    }

    pub fn with_per_value_size_limit(mut self, bytes: u64) -> Self {
        self.per_value_size_limit = bytes;
        self
    }

    pub fn with_strict_access(mut self, strict: bool) -> Self {
        self.strict_access_mode = strict;
        self
    }

    pub fn with_summary_max_chars(mut self, chars: usize) -> Self {
        self.summary_max_chars = chars;
        self
    }

    /// Reject option combinations the retention policy cannot honor.
    pub fn validate(&self) -> StoreResult<()> {
        if self.max_commit_count == 0 {
            return Err(StoreError::InvalidConfig(
                "max_commit_count must be > 0".into(),
            ));
        }
        if self.max_history_bytes == 0 {
            return Err(StoreError::InvalidConfig(
                "max_history_bytes must be > 0".into(),
            ));
        }
        if self.per_value_size_limit == 0 {
            return Err(StoreError::InvalidConfig(
                "per_value_size_limit must be > 0".into(),
            ));
        }
        if self.per_value_size_limit > self.max_history_bytes {
            return Err(StoreError::InvalidConfig(format!(
                "per_value_size_limit ({}) exceeds max_history_bytes ({})",
                self.per_value_size_limit, self.max_history_bytes
            )));
        }
        // A write charges its previous and new value, each capped at the
        // value limit (or a stub). One commit must fit below the low-water mark.
        let max_charge = self
            .per_value_size_limit
            .max(REFERENCE_STUB_COST)
            .saturating_mul(2);
        let low_water = RetentionPolicy::from_config(self).bytes_low_water();
        if max_charge > low_water {
            return Err(StoreError::InvalidConfig(format!(
                "a single write may charge {} bytes, above the {} byte low-water mark of max_history_bytes",
                max_charge, low_water
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.max_commit_count, 10_000);
        assert_eq!(config.max_history_bytes, 52_428_800);
        assert_eq!(config.per_value_size_limit, 102_400);
        assert!(!config.strict_access_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StoreConfig = serde_json::from_str(r#"{"strict_access_mode": true}"#).unwrap();
        assert!(config.strict_access_mode);
        assert_eq!(config.max_commit_count, DEFAULT_MAX_COMMIT_COUNT);
    }

    #[test]
    fn test_validate_rejects_zero_budgets() {
        assert!(StoreConfig::default()
            .with_max_commit_count(0)
            .validate()
            .is_err());
        assert!(StoreConfig::default()
            .with_max_history_bytes(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_rejects_value_limit_above_budget() {
        let err = StoreConfig::default()
            .with_max_history_bytes(1024)
            .with_per_value_size_limit(4096)
            .validate()
            .unwrap_err();
        assert_eq!(err.code(), "FLOWSTATE_INVALID_CONFIG");
    }

    #[test]
    fn test_validate_requires_one_write_below_low_water() {
        let err = StoreConfig::default()
            .with_max_history_bytes(1000)
            .with_per_value_size_limit(1000)
            .validate()
            .unwrap_err();
        assert_eq!(err.code(), "FLOWSTATE_INVALID_CONFIG");

        // 2 * 400 == 80% of 1000
        assert!(StoreConfig::default()
            .with_max_history_bytes(1000)
            .with_per_value_size_limit(400)
            .validate()
            .is_ok());
        // Stubs cost 64 bytes even under a tiny value limit
        assert!(StoreConfig::default()
            .with_max_history_bytes(100)
            .with_per_value_size_limit(10)
            .validate()
            .is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"max_commit_count": 50, "max_history_bytes": 4096, "per_value_size_limit": 512}}"#).unwrap();

        let config = StoreConfig::load(file.path()).unwrap();
        assert_eq!(config.max_commit_count, 50);
        assert_eq!(config.per_value_size_limit, 512);
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"max_commit_count": 0}}"#).unwrap();
        assert!(StoreConfig::load(file.path()).is_err());

        let missing = Path::new("/nonexistent/flowstate.json");
        assert!(matches!(
            StoreConfig::load(missing),
            Err(StoreError::InvalidConfig(_))
        ));
    }
}
