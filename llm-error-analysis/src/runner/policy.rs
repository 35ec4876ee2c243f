//! Pacing and consecutive-failure circuit breaking for sequential runs

use std::time::Duration;

use crate::config::BatchConfig;

/// Delays and the halt threshold shared by batch and backfill runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailurePolicy {
    /// Pause after an item that was not rate limited
    pub inter_request_delay: Duration,
    /// Pause after a rate-limited item that did not halt the run
    pub rate_limit_backoff: Duration,
    /// Consecutive failed items that stop the run; 0 disables halting
    pub max_consecutive_failures: u32,
}

impl FailurePolicy {
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            inter_request_delay: Duration::from_millis(config.inter_request_delay_ms),
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }

    /// Same thresholds, paced with the backfill delay
    pub fn for_backfill(config: &BatchConfig) -> Self {
        Self {
            inter_request_delay: Duration::from_millis(config.backfill_delay_ms),
            ..Self::from_config(config)
        }
    }

    pub fn tracker(&self) -> ConsecutiveFailures {
        ConsecutiveFailures {
            policy: self.clone(),
            count: 0,
        }
    }
}

/// How one item ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Clean,
    Failed { rate_limited: bool },
}

impl ItemOutcome {
    /// An item fails when its row was not written, any reply was rate
    /// limited, or every reply was an error placeholder.
    pub fn classify(persisted: bool, rate_limited: bool, all_errored: bool) -> Self {
        if persisted && !rate_limited && !all_errored {
            ItemOutcome::Clean
        } else {
            ItemOutcome::Failed { rate_limited }
        }
    }
}

/// What the run does after an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Proceed { delay: Duration },
    Halt,
}

/// Counts failed items in a row
#[derive(Debug, Clone)]
pub struct ConsecutiveFailures {
    policy: FailurePolicy,
    count: u32,
}

impl ConsecutiveFailures {
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Record an item and decide the next step
    pub fn record(&mut self, outcome: ItemOutcome) -> Step {
        match outcome {
            ItemOutcome::Clean => {
                self.count = 0;
                Step::Proceed {
                    delay: self.policy.inter_request_delay,
                }
            }
            ItemOutcome::Failed { rate_limited } => {
                self.count += 1;
                let threshold = self.policy.max_consecutive_failures;
                if threshold > 0 && self.count >= threshold {
                    return Step::Halt;
                }
                let delay = if rate_limited {
                    self.policy.rate_limit_backoff
                } else {
                    self.policy.inter_request_delay
                };
                Step::Proceed { delay }
            }
        }
    }
}
