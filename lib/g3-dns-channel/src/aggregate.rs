/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::sync::Mutex;

use crate::{AddressFamily, ResolveDriverError, ResolveError, ResolveMode, ResolvedAddrs};

pub type ResolveResult = Result<ResolvedAddrs, ResolveError>;
pub(crate) type ResolveCallback = Box<dyn FnOnce(ResolveResult) + Send>;

/// Merge state shared by the sub queries of one resolve call.
pub(crate) struct PendingRequest {
    inner: Mutex<PendingState>,
}

struct PendingState {
    mode: ResolveMode,
    remaining: usize,
    addrs: ResolvedAddrs,
    error: Option<ResolveError>,
    callback: Option<ResolveCallback>,
}

impl PendingRequest {
    pub(crate) fn new(mode: ResolveMode, callback: ResolveCallback) -> Self {
        PendingRequest {
            inner: Mutex::new(PendingState {
                mode,
                remaining: mode.sub_query_count(),
                addrs: ResolvedAddrs::default(),
                error: None,
                callback: Some(callback),
            }),
        }
    }

    /// Record the result of one sub query.
    ///
    /// Returns the caller callback together with the final result when the
    /// request is ready to be reported. This happens at most once.
    pub(crate) fn complete(
        &self,
        family: AddressFamily,
        result: Result<Vec<IpAddr>, ResolveError>,
    ) -> Option<(ResolveCallback, ResolveResult)> {
        let mut state = self.inner.lock().unwrap();
        if state.callback.is_none() {
            // already reported
            return None;
        }
        if !state.merge(family, result) {
            return None;
        }
        let callback = state.callback.take()?;
        Some((callback, state.take_result()))
    }
}

impl PendingState {
    fn merge(&mut self, family: AddressFamily, result: Result<Vec<IpAddr>, ResolveError>) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        let records = match result {
            Ok(records) => Some(records),
            Err(e) => {
                self.error = Some(e);
                None
            }
        };

        match self.mode {
            ResolveMode::Unspecific => {
                if let Some(records) = records {
                    self.addrs.append(family, records);
                }
                !self.addrs.is_empty() || self.remaining == 0
            }
            ResolveMode::Ipv4First | ResolveMode::Ipv6First | ResolveMode::Both => {
                if let Some(records) = records {
                    let prepend = self.mode.preferred_family().is_some_and(|preferred| {
                        self.addrs.last_family() == Some(preferred.opposite())
                    });
                    if prepend {
                        self.addrs.prepend(family, records);
                    } else {
                        self.addrs.append(family, records);
                    }
                }
                self.remaining == 0
            }
            ResolveMode::Ipv4Only | ResolveMode::Ipv6Only => {
                if let Some(records) = records {
                    self.addrs.append(family, records);
                }
                true
            }
        }
    }

    fn take_result(&mut self) -> ResolveResult {
        let addrs = std::mem::take(&mut self.addrs);
        if !addrs.is_empty() {
            return Ok(addrs);
        }
        Err(self
            .error
            .take()
            .unwrap_or(ResolveError::FromDriver(ResolveDriverError::NoAddress)))
    }
}
