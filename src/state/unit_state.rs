/// Unit state definitions for tracking crawl progress
use std::fmt;

/// Represents the current state of a crawl unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitState {
    // ===== Active States =====
    /// Unit is waiting in the frontier
    Queued,

    /// Unit has been claimed and its URL is being fetched
    Fetching,

    // ===== Terminal States =====
    /// Fetched and recorded in the aggregate as a text page or media asset
    Classified,

    /// Fetched, but neither a text page nor a retained media asset
    Ignored,

    /// Fetch failed after all retries and circuit rotations
    Failed,

    /// URL was already visited, never fetched
    Skipped,
}

impl UnitState {
    /// Returns true if no further processing is needed for the unit
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Fetching)
    }

    /// Returns true if the unit's URL belongs in the history store
    ///
    /// Skipped units are already there from a previous run or an earlier
    /// dequeue.
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Classified | Self::Ignored | Self::Failed)
    }

    /// Returns whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: UnitState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Fetching)
                | (Self::Queued, Self::Skipped)
                | (Self::Fetching, Self::Classified)
                | (Self::Fetching, Self::Ignored)
                | (Self::Fetching, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Classified => "classified",
            Self::Ignored => "ignored",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!UnitState::Queued.is_terminal());
        assert!(!UnitState::Fetching.is_terminal());

        assert!(UnitState::Classified.is_terminal());
        assert!(UnitState::Ignored.is_terminal());
        assert!(UnitState::Failed.is_terminal());
        assert!(UnitState::Skipped.is_terminal());
    }

    #[test]
    fn test_is_recorded() {
        assert!(UnitState::Classified.is_recorded());
        assert!(UnitState::Failed.is_recorded());
        assert!(UnitState::Ignored.is_recorded());
        assert!(!UnitState::Skipped.is_recorded());
        assert!(!UnitState::Queued.is_recorded());
    }

    #[test]
    fn test_transitions() {
        assert!(UnitState::Queued.can_transition_to(UnitState::Fetching));
        assert!(UnitState::Queued.can_transition_to(UnitState::Skipped));
        assert!(UnitState::Fetching.can_transition_to(UnitState::Failed));

        assert!(!UnitState::Queued.can_transition_to(UnitState::Classified));
        assert!(!UnitState::Skipped.can_transition_to(UnitState::Fetching));
        assert!(!UnitState::Classified.can_transition_to(UnitState::Failed));
    }

    #[test]
    fn test_display() {
        assert_eq!(UnitState::Classified.to_string(), "classified");
        assert_eq!(UnitState::Skipped.to_string(), "skipped");
    }
}
