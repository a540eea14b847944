//! State tracking for crawl units
//!
//! Every unit dequeued from the frontier moves through
//! `Queued -> Fetching -> {Classified | Ignored | Failed}` or goes straight
//! from `Queued` to `Skipped` when its URL was already visited.

mod unit_state;

pub use unit_state::UnitState;
