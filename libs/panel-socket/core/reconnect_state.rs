//! Reconnect bookkeeping
//!
//! Pairs the attempt counter with the configured [`ReconnectionStrategy`].
//! The strategy decides the delay for each attempt; this type remembers how
//! far along the current outage is.

use crate::traits::ReconnectionStrategy;
use std::time::Duration;

/// Snapshot of the reconnect counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectState {
    /// Attempts started since the last successful connection
    pub attempts: u32,
    /// Delay that will be (or was last) waited before the next attempt
    pub current_interval: Duration,
}

/// Outcome of asking for the next reconnect slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAttempt {
    /// Wait `delay`, then start attempt number `attempt` (1-indexed)
    After { attempt: u32, delay: Duration },
    /// The strategy gave up after `attempts` attempts
    Exhausted { attempts: u32 },
}

pub(crate) struct ReconnectTracker {
    strategy: Box<dyn ReconnectionStrategy>,
    state: ReconnectState,
}

impl ReconnectTracker {
    pub(crate) fn new(strategy: Box<dyn ReconnectionStrategy>) -> Self {
        let base = strategy.base_delay();
        Self {
            strategy,
            state: ReconnectState {
                attempts: 0,
                current_interval: base,
            },
        }
    }

    /// Reserve the next attempt, growing the interval for the one after
    pub(crate) fn schedule(&mut self) -> NextAttempt {
        let attempts = self.state.attempts;
        match self.strategy.next_delay(attempts) {
            Some(delay) if self.strategy.should_reconnect(attempts) => {
                self.state.attempts = attempts + 1;
                self.state.current_interval = self
                    .strategy
                    .next_delay(attempts + 1)
                    .unwrap_or(delay);
                NextAttempt::After {
                    attempt: attempts + 1,
                    delay,
                }
            }
            _ => NextAttempt::Exhausted { attempts },
        }
    }

    /// Back to base after a successful connection
    pub(crate) fn reset(&mut self) {
        self.state = ReconnectState {
            attempts: 0,
            current_interval: self.strategy.base_delay(),
        };
    }

    pub(crate) fn state(&self) -> ReconnectState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ExponentialBackoff, NeverReconnect};

    fn tracker(max_attempts: Option<u32>) -> ReconnectTracker {
        ReconnectTracker::new(Box::new(ExponentialBackoff::new(
            Duration::from_millis(1000),
            Duration::from_millis(30_000),
            max_attempts,
        )))
    }

    #[test]
    fn test_schedule_sequence_then_exhausted() {
        let mut tracker = tracker(Some(3));

        let delays: Vec<NextAttempt> = (0..4).map(|_| tracker.schedule()).collect();
        assert_eq!(
            delays,
            vec![
                NextAttempt::After { attempt: 1, delay: Duration::from_millis(1000) },
                NextAttempt::After { attempt: 2, delay: Duration::from_millis(1500) },
                NextAttempt::After { attempt: 3, delay: Duration::from_millis(2250) },
                NextAttempt::Exhausted { attempts: 3 },
            ]
        );
    }

    #[test]
    fn test_interval_grows_and_resets() {
        let mut tracker = tracker(None);
        assert_eq!(tracker.state().current_interval, Duration::from_millis(1000));

        tracker.schedule();
        assert_eq!(tracker.state().attempts, 1);
        assert_eq!(tracker.state().current_interval, Duration::from_millis(1500));

        tracker.schedule();
        tracker.reset();
        assert_eq!(
            tracker.state(),
            ReconnectState {
                attempts: 0,
                current_interval: Duration::from_millis(1000),
            }
        );
    }

    #[test]
    fn test_never_reconnect_is_exhausted_immediately() {
        let mut tracker = ReconnectTracker::new(Box::new(NeverReconnect));
        assert_eq!(tracker.schedule(), NextAttempt::Exhausted { attempts: 0 });
    }
}
