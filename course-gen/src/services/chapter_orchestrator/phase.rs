//! Chapter run state machine
//!
//! NotStarted → Outline → Sections(0..N) → Assembly → CoherenceCheck →
//! Persisting → Persisted, with Failed and Cancelled reachable from any
//! non-terminal phase.

use std::fmt;

/// Phase of one chapter generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterPhase {
    NotStarted,
    Outline,
    /// About to write section `index` (0-based) of `total`
    Sections { index: usize, total: usize },
    Assembly,
    CoherenceCheck,
    Persisting,
    Persisted,
    Failed,
    Cancelled,
}

impl ChapterPhase {
    /// Progress fraction reported on entering this phase
    pub fn progress(self) -> f64 {
        match self {
            ChapterPhase::NotStarted | ChapterPhase::Failed | ChapterPhase::Cancelled => 0.0,
            ChapterPhase::Outline => 0.05,
            ChapterPhase::Sections { index, total } => {
                if total == 0 {
                    0.2
                } else {
                    0.2 + 0.5 * (index as f64 / total as f64)
                }
            }
            ChapterPhase::Assembly => 0.7,
            ChapterPhase::CoherenceCheck => 0.85,
            ChapterPhase::Persisting => 0.95,
            ChapterPhase::Persisted => 1.0,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ChapterPhase::Persisted | ChapterPhase::Failed | ChapterPhase::Cancelled
        )
    }

    /// Ordering rank used to reject backward transitions
    fn rank(self) -> usize {
        match self {
            ChapterPhase::NotStarted => 0,
            ChapterPhase::Outline => 1,
            ChapterPhase::Sections { index, .. } => 2 + index,
            ChapterPhase::Assembly => usize::MAX - 4,
            ChapterPhase::CoherenceCheck => usize::MAX - 3,
            ChapterPhase::Persisting => usize::MAX - 2,
            ChapterPhase::Persisted | ChapterPhase::Failed | ChapterPhase::Cancelled => {
                usize::MAX
            }
        }
    }

    /// Whether `next` may follow `self`
    pub fn can_advance_to(self, next: ChapterPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            ChapterPhase::Failed | ChapterPhase::Cancelled => true,
            _ => next.rank() > self.rank(),
        }
    }
}

impl fmt::Display for ChapterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChapterPhase::NotStarted => write!(f, "Queued"),
            ChapterPhase::Outline => write!(f, "Generating outline"),
            ChapterPhase::Sections { index, total } => {
                write!(f, "Writing section {} of {}", index + 1, total)
            }
            ChapterPhase::Assembly => write!(f, "Writing introduction, conclusion and glossary"),
            ChapterPhase::CoherenceCheck => write!(f, "Checking coherence"),
            ChapterPhase::Persisting => write!(f, "Saving chapter"),
            ChapterPhase::Persisted => write!(f, "Completed"),
            ChapterPhase::Failed => write!(f, "Failed"),
            ChapterPhase::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_progress_formula() {
        let phase = ChapterPhase::Sections { index: 2, total: 7 };
        let expected = 0.2 + 0.5 * (2.0 / 7.0);
        assert!((phase.progress() - expected).abs() < 1e-12);
        assert_eq!(phase.to_string(), "Writing section 3 of 7");
    }

    #[test]
    fn test_progress_increases_along_happy_path() {
        let total = 5;
        let mut path = vec![ChapterPhase::NotStarted, ChapterPhase::Outline];
        path.extend((0..total).map(|index| ChapterPhase::Sections { index, total }));
        path.extend([
            ChapterPhase::Assembly,
            ChapterPhase::CoherenceCheck,
            ChapterPhase::Persisting,
            ChapterPhase::Persisted,
        ]);

        for pair in path.windows(2) {
            assert!(pair[1].progress() > pair[0].progress(), "{:?}", pair);
            assert!(pair[0].can_advance_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn test_last_section_stays_below_assembly() {
        let last = ChapterPhase::Sections { index: 7, total: 8 };
        assert!(last.progress() < ChapterPhase::Assembly.progress());
    }

    #[test]
    fn test_no_backward_or_post_terminal_transitions() {
        assert!(!ChapterPhase::Assembly.can_advance_to(ChapterPhase::Outline));
        assert!(!ChapterPhase::Persisted.can_advance_to(ChapterPhase::Failed));
        assert!(!ChapterPhase::Failed.can_advance_to(ChapterPhase::Outline));
        assert!(ChapterPhase::Sections { index: 1, total: 5 }.can_advance_to(ChapterPhase::Cancelled));
    }
}
