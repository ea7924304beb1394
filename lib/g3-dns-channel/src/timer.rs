/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;

#[derive(Debug, Eq, PartialEq)]
pub(crate) enum TimerFire {
    /// The timer has been stopped or restarted since this task was armed.
    Stale,
    /// No engine processing for a whole period, run it now and rearm for a
    /// full period.
    Process,
    /// Engine processing happened recently, sleep for the rest of the period.
    Wait(Duration),
}

/// Drift corrected periodic timer state.
///
/// The timer task itself lives in the channel, this only keeps the tick
/// bookkeeping and the handle needed to stop it.
pub(crate) struct TimerDriver {
    period: Duration,
    last_tick: Instant,
    epoch: u64,
    task: Option<AbortHandle>,
}

impl TimerDriver {
    pub(crate) fn new(period: Duration) -> Self {
        TimerDriver {
            period,
            last_tick: Instant::now(),
            epoch: 0,
            task: None,
        }
    }

    #[inline]
    pub(crate) fn period(&self) -> Duration {
        self.period
    }

    #[inline]
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    #[inline]
    pub(crate) fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Begin a new run, returns the epoch the timer task should carry.
    pub(crate) fn start(&mut self, now: Instant) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.last_tick = now;
        self.epoch
    }

    pub(crate) fn attach(&mut self, task: AbortHandle) {
        if let Some(old) = self.task.replace(task) {
            old.abort();
        }
    }

    /// Returns true if a running timer was stopped.
    pub(crate) fn stop(&mut self) -> bool {
        self.epoch = self.epoch.wrapping_add(1);
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// The timer task exited on its own.
    pub(crate) fn detach(&mut self, epoch: u64) {
        if epoch == self.epoch {
            self.task = None;
        }
    }

    pub(crate) fn refresh(&mut self, now: Instant) {
        self.last_tick = now;
    }

    pub(crate) fn fire(&mut self, epoch: u64, now: Instant) -> TimerFire {
        if epoch != self.epoch {
            return TimerFire::Stale;
        }
        let deadline = self.last_tick + self.period;
        if deadline <= now {
            self.last_tick = now;
            TimerFire::Process
        } else {
            TimerFire::Wait(deadline - now)
        }
    }
}
