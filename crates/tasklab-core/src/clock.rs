//! Clock port for obtaining the current time.
//!
//! Validation rules such as "must not be in the future" compare against the
//! wall clock at validation time. Substituting a [`FixedClock`] makes those
//! comparisons deterministic in tests and in the demo script.

use chrono::{DateTime, SubsecRound, Utc};

/// Provides the current time.
pub trait Clock {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    frozen_at: DateTime<Utc>,
}

impl FixedClock {
    /// Freeze the clock at `at`, truncated to millisecond precision.
    #[must_use]
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            frozen_at: at.trunc_subsecs(3),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.frozen_at
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
