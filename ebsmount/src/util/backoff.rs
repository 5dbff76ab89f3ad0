//! Retry budget and exponential backoff schedule.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::runtime::constants::backoff as defaults;

/// How many attempts a retry loop may make.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxAttempts {
    Bounded(u64),
    /// Retry until success.
    #[default]
    Unbounded,
}

impl MaxAttempts {
    /// Whether another attempt is allowed after `made` attempts.
    pub fn allows(&self, made: u64) -> bool {
        match self {
            MaxAttempts::Bounded(max) => made < *max,
            MaxAttempts::Unbounded => true,
        }
    }
}

/// Exponential backoff parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    #[serde(with = "duration_secs")]
    pub min: Duration,
    #[serde(with = "duration_secs")]
    pub max: Duration,
    pub factor: f64,
    /// Randomize each delay between `min` and the exponential value.
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            min: defaults::MIN,
            max: defaults::MAX,
            factor: defaults::FACTOR,
            jitter: false,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (0-based).
    ///
    /// `min * factor^attempt`, clamped to `[min, max]`. With jitter the
    /// value is drawn uniformly from `[min, min * factor^attempt]` first.
    /// A zero `min` is replaced by a 100ms floor, a zero `max` by the
    /// default maximum.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let min = if self.min.is_zero() {
            defaults::FLOOR
        } else {
            self.min
        };
        let max = if self.max.is_zero() {
            defaults::MAX
        } else {
            self.max
        };
        if min >= max {
            return max;
        }

        let min_secs = min.as_secs_f64();
        let mut delay = min_secs * self.factor.powi(attempt.min(i32::MAX as u32) as i32);
        if self.jitter {
            delay = rand::random::<f64>() * (delay - min_secs) + min_secs;
        }

        if !delay.is_finite() || delay >= max.as_secs_f64() {
            return max;
        }
        Duration::from_secs_f64(delay).max(min)
    }
}

/// Stateful iterator over a [`BackoffPolicy`].
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Next delay; each call advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.policy.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Attempt limit plus backoff schedule for the attachment reconciler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryBudget {
    pub max_attempts: MaxAttempts,
    pub backoff: BackoffPolicy,
}

impl RetryBudget {
    pub fn new(max_attempts: MaxAttempts, backoff: BackoffPolicy) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Sum of the sleeps a run of `attempts` failing attempts performs (no jitter).
    pub fn total_delay(&self, attempts: u64) -> Duration {
        let mut backoff = Backoff::new(self.backoff.clone());
        (1..attempts).map(|_| backoff.next_delay()).sum()
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
