use serde::{Deserialize, Serialize};
use std::cmp::max;
use std::collections::BTreeMap;

/// Outcome counters of every rule variant, keyed by `rule::variant`.
#[derive(Default, Debug, Clone, Deserialize, Serialize)]
pub struct GenerationStatistics {
    pub successful_mapping: BTreeMap<String, usize>,
    pub failed_mapping: BTreeMap<String, usize>,
    /// Longest run of failed variants within one rule.
    pub max_failed_attempts: usize,
    /// Programs discarded before the returned one.
    pub discarded_programs: usize,
}

impl GenerationStatistics {
    pub fn record_success(&mut self, rule: &str, variant: &str) {
        *self
            .successful_mapping
            .entry(format!("{}::{}", rule, variant))
            .or_insert(0) += 1;
    }

    pub fn record_failure(&mut self, rule: &str, variant: &str, failed_attempts: usize) {
        *self
            .failed_mapping
            .entry(format!("{}::{}", rule, variant))
            .or_insert(0) += 1;
        self.max_failed_attempts = max(self.max_failed_attempts, failed_attempts);
    }

    pub fn total_successes(&self) -> usize {
        self.successful_mapping.values().sum()
    }

    pub fn total_failures(&self) -> usize {
        self.failed_mapping.values().sum()
    }
}
