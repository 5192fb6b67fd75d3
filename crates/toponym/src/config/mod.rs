use serde::{Deserialize, Serialize};

use crate::search::QueryPolicy;

/// Number of records returned when the caller does not ask for more.
pub const DEFAULT_MAX_RECORDS: usize = 1;

/// Per-gazetteer search defaults. Individual requests may override the
/// record count and the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Upper bound on returned records.
    pub max_records: usize,
    /// Count every match instead of reporting an unknown total for full pages.
    pub count_total: bool,
    pub policy: QueryPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            count_total: false,
            policy: QueryPolicy::Curated,
        }
    }
}

/// Builder for creating search configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    /// Overrides first, then hierarchical decomposition.
    pub fn curated() -> Self {
        Self::new().policy(QueryPolicy::Curated)
    }

    /// Hierarchical decomposition with a per-keyword fallback, no overrides.
    pub fn keyword_fallback() -> Self {
        Self::new().policy(QueryPolicy::KeywordFallback)
    }

    /// Set the maximum number of records to return (at least one)
    pub fn max_records(mut self, max: usize) -> Self {
        self.config.max_records = max.max(1);
        self
    }

    /// Always compute the full match count
    pub fn count_total(mut self, enabled: bool) -> Self {
        self.config.count_total = enabled;
        self
    }

    pub fn policy(mut self, policy: QueryPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> SearchConfig {
        self.config
    }
}
