use std::sync::atomic::{AtomicU64, Ordering};

use superpane_api::{PaneError, Result};

/// Monotonic trigger counter used to drop results of superseded runs.
///
/// Each trigger takes a fresh generation before it starts fetching; when its
/// result arrives it is only applied if no newer trigger has advanced the
/// counter in the meantime.
#[derive(Debug, Default)]
pub struct Generation(AtomicU64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation and return it.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    /// `Err(StaleResultDiscarded)` once `generation` has been superseded.
    pub fn check(&self, generation: u64, operation: &'static str) -> Result<()> {
        if self.is_current(generation) {
            Ok(())
        } else {
            Err(PaneError::StaleResultDiscarded {
                operation,
                generation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn older_generations_are_stale() {
        let generation = Generation::new();
        let first = generation.advance();
        assert!(generation.check(first, "count").is_ok());

        let second = generation.advance();
        assert!(second > first);
        assert_eq!(
            generation.check(first, "count"),
            Err(PaneError::StaleResultDiscarded {
                operation: "count",
                generation: first,
            })
        );
        assert!(generation.is_current(second));
    }
}
