/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ChannelStats {
    resolve_total: AtomicU64,
    sub_query_total: AtomicU64,
    sub_query_failed: AtomicU64,
    socket_opened: AtomicU64,
    socket_closed: AtomicU64,
    timer_started: AtomicU64,
    timer_stopped: AtomicU64,
    timer_ticks: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ChannelSnapshot {
    pub resolve_total: u64,
    pub sub_query_total: u64,
    pub sub_query_failed: u64,
    pub socket_opened: u64,
    pub socket_closed: u64,
    pub timer_started: u64,
    pub timer_stopped: u64,
    pub timer_ticks: u64,
}

impl ChannelStats {
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            resolve_total: self.resolve_total.load(Ordering::Relaxed),
            sub_query_total: self.sub_query_total.load(Ordering::Relaxed),
            sub_query_failed: self.sub_query_failed.load(Ordering::Relaxed),
            socket_opened: self.socket_opened.load(Ordering::Relaxed),
            socket_closed: self.socket_closed.load(Ordering::Relaxed),
            timer_started: self.timer_started.load(Ordering::Relaxed),
            timer_stopped: self.timer_stopped.load(Ordering::Relaxed),
            timer_ticks: self.timer_ticks.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn add_resolve(&self) {
        self.resolve_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_sub_query(&self) {
        self.sub_query_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_sub_query_failed(&self) {
        self.sub_query_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_socket_opened(&self) {
        self.socket_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_socket_closed(&self) {
        self.socket_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_timer_started(&self) {
        self.timer_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_timer_stopped(&self) {
        self.timer_stopped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_timer_tick(&self) {
        self.timer_ticks.fetch_add(1, Ordering::Relaxed);
    }
}
