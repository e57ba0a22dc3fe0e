use crate::error::{MatrixError, Result};

/// Quadrant size at or above which a product task recurses instead of
/// running the triple loop.
pub const DEFAULT_THRESHOLD: usize = 256;

/// Environment variable overriding [`ParallelConfig::threshold`].
pub const THRESHOLD_ENV: &str = "PM_THRESHOLD";

/// Environment variable overriding [`ParallelConfig::num_threads`].
pub const NUM_THREADS_ENV: &str = "PM_NUM_THREADS";

/// Configuration for the recursive parallel engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Recursion cutoff. A quadrant product whose side length is at least
    /// this value is split again; smaller ones run sequentially.
    pub threshold: usize,
    /// Worker threads in the backend's pool. Zero means one per logical CPU.
    pub num_threads: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        ParallelConfig {
            threshold: DEFAULT_THRESHOLD,
            num_threads: 0,
        }
    }
}

impl ParallelConfig {
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Defaults overlaid with `PM_THRESHOLD` / `PM_NUM_THREADS` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`, keyed by the environment
    /// variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ParallelConfig::default();
        if let Some(v) = lookup(THRESHOLD_ENV) {
            config.threshold = parse_usize(THRESHOLD_ENV, &v)?;
        }
        if let Some(v) = lookup(NUM_THREADS_ENV) {
            config.num_threads = parse_usize(NUM_THREADS_ENV, &v)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can drive the engine.
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(MatrixError::InvalidConfig(
                "threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        MatrixError::InvalidConfig(format!("{key}={value:?} is not a non-negative integer"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let c = ParallelConfig::default();
        assert_eq!(c.threshold, 256);
        assert_eq!(c.num_threads, 0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let c = ParallelConfig::default()
            .with_threshold(64)
            .with_num_threads(4);
        assert_eq!(c.threshold, 64);
        assert_eq!(c.num_threads, 4);
    }

    #[test]
    fn test_zero_threshold_invalid() {
        let c = ParallelConfig::default().with_threshold(0);
        assert!(matches!(c.validate(), Err(MatrixError::InvalidConfig(_))));
    }

    #[test]
    fn test_lookup_overlay() {
        let c = ParallelConfig::from_lookup(lookup(&[
            ("PM_THRESHOLD", "32"),
            ("PM_NUM_THREADS", " 2 "),
        ]))
        .unwrap();
        assert_eq!(c, ParallelConfig::default().with_threshold(32).with_num_threads(2));
    }

    #[test]
    fn test_lookup_empty_uses_defaults() {
        let c = ParallelConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(c, ParallelConfig::default());
    }

    #[test]
    fn test_lookup_rejects_garbage() {
        assert!(ParallelConfig::from_lookup(lookup(&[("PM_THRESHOLD", "big")])).is_err());
        assert!(ParallelConfig::from_lookup(lookup(&[("PM_NUM_THREADS", "-1")])).is_err());
        assert!(ParallelConfig::from_lookup(lookup(&[("PM_THRESHOLD", "0")])).is_err());
    }
}
