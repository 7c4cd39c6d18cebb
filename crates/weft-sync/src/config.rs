//! Session configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::Session`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum operations requested per read.
    pub read_limit: usize,
    /// Long-poll duration passed to reads; negative disables waiting.
    pub poll_duration_ms: i64,
    /// When set, journal entries more than this many versions behind the
    /// session are dropped after each pull.
    #[serde(default)]
    pub journal_retention: Option<i64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_limit: 1000,
            poll_duration_ms: 30_000,
            journal_retention: None,
        }
    }
}

/// Builder for session configuration.
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    pub fn read_limit(mut self, limit: usize) -> Self {
        self.config.read_limit = limit;
        self
    }

    pub fn poll_duration_ms(mut self, ms: i64) -> Self {
        self.config.poll_duration_ms = ms;
        self
    }

    pub fn journal_retention(mut self, versions: i64) -> Self {
        self.config.journal_retention = Some(versions);
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.read_limit, 1000);
        assert_eq!(config.poll_duration_ms, 30_000);
        assert_eq!(config.journal_retention, None);
    }

    #[test]
    fn test_builder() {
        let config = SessionConfigBuilder::new()
            .read_limit(10)
            .poll_duration_ms(-1)
            .journal_retention(100)
            .build();
        assert_eq!(config.read_limit, 10);
        assert_eq!(config.poll_duration_ms, -1);
        assert_eq!(config.journal_retention, Some(100));

        let json = serde_json::to_string(&config).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
