//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] selects the execution strategy for capture and
//! restore and the size of the worker pool that runs their tasks.

use std::error::Error;
use std::fmt;

// ── SchedulingStrategy ─────────────────────────────────────────────

/// How capture and restore work is split into tasks.
///
/// Both strategies write byte-identical container contents and produce
/// identical deferred mutation lists for the same input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulingStrategy {
    /// One task per (group, field) pair, covering every batch of the
    /// group. Every task owns one field sub-array outright, so no shared
    /// buffer access is needed.
    PerField,
    /// One task per batch, covering every field of the batch's group.
    /// Fewer tasks; slots are written through a shared slot writer.
    Grouped,
}

impl Default for SchedulingStrategy {
    /// `PerField` in debug builds, where the extra checking is wanted;
    /// `Grouped` otherwise.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::PerField
        } else {
            Self::Grouped
        }
    }
}

impl fmt::Display for SchedulingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerField => write!(f, "per-field"),
            Self::Grouped => write!(f, "grouped"),
        }
    }
}

// ── EngineConfig ───────────────────────────────────────────────────

/// Configuration for [`SnapshotEngine`](crate::SnapshotEngine).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Task split used by capture and restore.
    pub strategy: SchedulingStrategy,
    /// Number of worker threads. `None` = auto-detect from
    /// `available_parallelism`. Explicit values are clamped to `[1, 64]`.
    pub worker_count: Option<usize>,
}

impl EngineConfig {
    /// A config with an explicit strategy and auto-detected workers.
    pub fn with_strategy(strategy: SchedulingStrategy) -> Self {
        Self {
            strategy,
            worker_count: None,
        }
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    /// Resolve the actual worker count, applying auto-detection if `None`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 64),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, 64),
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`EngineConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `worker_count` was explicitly set to zero.
    ZeroWorkers,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroWorkers => write!(f, "worker_count must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn default_strategy_follows_build_profile() {
        let expected = if cfg!(debug_assertions) {
            SchedulingStrategy::PerField
        } else {
            SchedulingStrategy::Grouped
        };
        assert_eq!(SchedulingStrategy::default(), expected);
    }

    #[test]
    fn zero_workers_rejected() {
        let cfg = EngineConfig {
            worker_count: Some(0),
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroWorkers));
        assert_eq!(
            ConfigError::ZeroWorkers.to_string(),
            "worker_count must be at least 1"
        );
    }

    #[test]
    fn resolved_worker_count_clamps_zero() {
        let cfg = EngineConfig {
            worker_count: Some(0),
            ..EngineConfig::default()
        };
        assert_eq!(cfg.resolved_worker_count(), 1);
    }

    #[test]
    fn resolved_worker_count_clamps_large() {
        let cfg = EngineConfig {
            worker_count: Some(500),
            ..EngineConfig::default()
        };
        assert_eq!(cfg.resolved_worker_count(), 64);
    }

    #[test]
    fn resolved_worker_count_auto() {
        let n = EngineConfig::default().resolved_worker_count();
        assert!((1..=64).contains(&n), "auto count {n} out of range");
    }

    #[test]
    fn strategy_display() {
        assert_eq!(SchedulingStrategy::PerField.to_string(), "per-field");
        assert_eq!(SchedulingStrategy::Grouped.to_string(), "grouped");
    }
}
