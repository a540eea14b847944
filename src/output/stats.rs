//! Crawl statistics
//!
//! Counters gathered by the coordinator while a crawl runs, and the
//! end-of-run report printed by the CLI.

use crate::state::UnitState;
use std::collections::HashMap;
use std::time::Duration;

/// Counters for one crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Units that reached a terminal state, by state
    pub units_by_state: HashMap<UnitState, u64>,

    /// Fetch failures by error kind (network, timeout, http, blocked)
    pub failures_by_kind: HashMap<&'static str, u64>,

    /// Units discovered and pushed onto the frontier (including the seed)
    pub enqueued: u64,

    /// Deepest depth any fetched unit had
    pub max_depth_reached: u32,

    /// Tor circuit rotations issued during the run
    pub circuit_rotations: u64,

    /// URLs in the history store when the run started
    pub history_before: usize,

    /// URLs in the history store when the run ended
    pub history_after: usize,

    /// Units still queued when the run stopped early
    pub abandoned: u64,

    /// Whether the run was cancelled before the frontier drained
    pub cancelled: bool,

    pub elapsed: Duration,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a unit reaching a terminal state
    pub fn record(&mut self, state: UnitState) {
        *self.units_by_state.entry(state).or_insert(0) += 1;
    }

    pub fn record_failure(&mut self, kind: &'static str) {
        *self.failures_by_kind.entry(kind).or_insert(0) += 1;
    }

    pub fn count(&self, state: UnitState) -> u64 {
        self.units_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Units that were actually fetched, successfully or not
    pub fn fetched(&self) -> u64 {
        self.count(UnitState::Classified) + self.count(UnitState::Ignored) + self.count(UnitState::Failed)
    }

    pub fn failed(&self) -> u64 {
        self.count(UnitState::Failed)
    }

    /// Percentage of fetched units that were classified into the aggregate
    pub fn success_rate(&self) -> f64 {
        let fetched = self.fetched();
        if fetched == 0 {
            return 0.0;
        }
        (self.count(UnitState::Classified) as f64 / fetched as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Units enqueued: {}", stats.enqueued);
    println!("  Units fetched: {}", stats.fetched());
    println!("  Deepest level reached: {}", stats.max_depth_reached);
    println!("  Circuit rotations: {}", stats.circuit_rotations);
    println!(
        "  History: {} -> {} URLs",
        stats.history_before, stats.history_after
    );
    println!("  Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
    if stats.cancelled {
        println!("  Cancelled with {} units still queued", stats.abandoned);
    }
    println!();

    println!("Units by State:");
    let mut state_counts: Vec<_> = stats.units_by_state.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
    for (state, count) in state_counts {
        println!("  {}: {}", state, count);
    }
    println!();

    if !stats.failures_by_kind.is_empty() {
        println!("Failures:");
        let mut failure_counts: Vec<_> = stats.failures_by_kind.iter().collect();
        failure_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (kind, count) in failure_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} fetched units classified)",
        stats.success_rate(),
        stats.count(UnitState::Classified),
        stats.fetched()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut stats = CrawlStatistics::new();
        stats.record(UnitState::Classified);
        stats.record(UnitState::Classified);
        stats.record(UnitState::Classified);
        stats.record(UnitState::Failed);
        stats.record(UnitState::Skipped);

        assert_eq!(stats.fetched(), 4);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.count(UnitState::Skipped), 1);
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_success_rate_without_fetches() {
        let stats = CrawlStatistics::new();
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_failure_kinds() {
        let mut stats = CrawlStatistics::new();
        stats.record_failure("network");
        stats.record_failure("network");
        stats.record_failure("timeout");

        assert_eq!(stats.failures_by_kind["network"], 2);
        assert_eq!(stats.failures_by_kind["timeout"], 1);
    }
}
