//! Per-candidate retry schedule.

use std::time::Duration;

/// Delays used when no configuration overrides them.
pub const DEFAULT_RETRY_DELAYS_MS: [u64; 4] = [0, 250, 600, 1200];

/// One planned attempt in the candidate × attempt matrix.
///
/// Ephemeral: drives the executor's loop and its logs, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestAttempt {
    pub candidate_index: usize,
    pub attempt_index: usize,
    /// Wait before this attempt.
    pub delay: Duration,
    /// Transport failure of this attempt, once made.
    pub error: Option<String>,
}

/// Backoff delays applied to each candidate.
///
/// The list is the only timing control of the executor: its length is the
/// number of attempts per candidate, and each entry is the wait before that
/// attempt. Delays never decrease.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(&DEFAULT_RETRY_DELAYS_MS)
    }
}

impl RetryPolicy {
    /// Build a policy from explicit delays.
    ///
    /// An empty list becomes a single immediate attempt; a decreasing entry is
    /// raised to the previous one.
    #[must_use]
    pub fn new(delays: Vec<Duration>) -> Self {
        if delays.is_empty() {
            return Self {
                delays: vec![Duration::ZERO],
            };
        }

        let mut floor = Duration::ZERO;
        let delays = delays
            .into_iter()
            .map(|d| {
                floor = floor.max(d);
                floor
            })
            .collect();
        Self { delays }
    }

    #[must_use]
    pub fn from_millis(delays: &[u64]) -> Self {
        Self::new(delays.iter().copied().map(Duration::from_millis).collect())
    }

    /// `attempts` immediate attempts per candidate.
    #[must_use]
    pub fn immediate(attempts: usize) -> Self {
        Self::new(vec![Duration::ZERO; attempts.max(1)])
    }

    pub fn attempts_per_candidate(&self) -> usize {
        self.delays.len()
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Every attempt for `candidates` endpoints, candidate-major.
    pub fn schedule(&self, candidates: usize) -> impl Iterator<Item = RequestAttempt> + '_ {
        (0..candidates).flat_map(move |candidate_index| {
            self.delays
                .iter()
                .enumerate()
                .map(move |(attempt_index, delay)| RequestAttempt {
                    candidate_index,
                    attempt_index,
                    delay: *delay,
                    error: None,
                })
        })
    }
}
