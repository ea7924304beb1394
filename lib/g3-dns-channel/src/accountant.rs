/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::ChannelStats;
use crate::timer::{TimerDriver, TimerFire};

/// Count of sub queries handed to the engine, and the timer that runs while
/// it is not zero.
///
/// Every change goes through one mutex so concurrent resolve calls observe a
/// single order of increments, decrements and timer start / stop decisions.
pub(crate) struct RequestAccountant {
    inner: Mutex<AccountantState>,
    stats: Arc<ChannelStats>,
}

struct AccountantState {
    outstanding: usize,
    timer: TimerDriver,
}

impl RequestAccountant {
    pub(crate) fn new(period: Duration, stats: Arc<ChannelStats>) -> Self {
        RequestAccountant {
            inner: Mutex::new(AccountantState {
                outstanding: 0,
                timer: TimerDriver::new(period),
            }),
            stats,
        }
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.inner.lock().unwrap().outstanding
    }

    #[cfg(test)]
    fn timer_running(&self) -> bool {
        self.inner.lock().unwrap().timer.is_running()
    }

    /// Count a new sub query. If no timer is running, `spawn_timer` is called
    /// with the new timer epoch and the first sleep interval.
    pub(crate) fn add_request<F>(&self, spawn_timer: F)
    where
        F: FnOnce(u64, Duration) -> AbortHandle,
    {
        let mut state = self.inner.lock().unwrap();
        state.outstanding += 1;
        if !state.timer.is_running() {
            let epoch = state.timer.start(Instant::now());
            let task = spawn_timer(epoch, state.timer.period());
            state.timer.attach(task);
            self.stats.add_timer_started();
            debug!("timer started with {} outstanding", state.outstanding);
        }
    }

    pub(crate) fn remove_request(&self) {
        let mut state = self.inner.lock().unwrap();
        debug_assert!(state.outstanding > 0);
        state.outstanding = state.outstanding.saturating_sub(1);
        if state.outstanding == 0 && state.timer.stop() {
            self.stats.add_timer_stopped();
            debug!("timer stopped as no request is outstanding");
        }
    }

    pub(crate) fn stop_timer(&self) {
        let mut state = self.inner.lock().unwrap();
        if state.timer.stop() {
            self.stats.add_timer_stopped();
            debug!("timer stopped with {} outstanding", state.outstanding);
        }
    }

    pub(crate) fn refresh_tick(&self) {
        let mut state = self.inner.lock().unwrap();
        state.timer.refresh(Instant::now());
    }

    pub(crate) fn timer_fire(&self, epoch: u64) -> TimerFire {
        let mut state = self.inner.lock().unwrap();
        let fire = state.timer.fire(epoch, Instant::now());
        if fire == TimerFire::Process {
            self.stats.add_timer_tick();
        }
        fire
    }

    /// Whether the timer of `epoch` should sleep again.
    pub(crate) fn timer_rearm(&self, epoch: u64) -> bool {
        let mut state = self.inner.lock().unwrap();
        if state.timer.epoch() != epoch {
            return false;
        }
        if state.outstanding == 0 {
            state.timer.detach(epoch);
            return false;
        }
        true
    }
}
