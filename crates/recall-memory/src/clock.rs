// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Injectable wall clock used for timestamps, temporal relevance and cleanup.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Duration, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<ArcSwap<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn starting_at(time: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(time)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.current.rcu(|now| **now + by);
    }

    pub fn advance_hours(&self, hours: i64) {
        self.advance(Duration::hours(hours));
    }

    pub fn set(&self, time: DateTime<Utc>) {
        self.current.store(Arc::new(time));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        **self.current.load()
    }
}
