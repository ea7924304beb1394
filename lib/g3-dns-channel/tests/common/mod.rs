/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::oneshot;

use g3_dns_channel::{
    AddressFamily, Channel, EngineIo, EngineOptions, ResolveDriverError, ResolveEngine,
    ResolveError, ResolveResult, SubQueryCompletion,
};

pub type SubQueryResult = Result<Vec<IpAddr>, ResolveError>;

/// Engine keeping every query pending until the test completes it.
#[derive(Default)]
pub struct MockEngine {
    pub options: Option<EngineOptions>,
    pub servers: Vec<SocketAddr>,
    pub issued: Vec<(String, AddressFamily)>,
    pub pending: Vec<(String, AddressFamily, SubQueryCompletion)>,
    /// Answered from within `query_host` when set.
    pub instant: HashMap<AddressFamily, SubQueryResult>,
    pub shutdown: Arc<AtomicBool>,
}

impl MockEngine {
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Complete the oldest pending sub query of `family`.
    pub fn finish(&mut self, family: AddressFamily, result: SubQueryResult) {
        let Some(pos) = self.pending.iter().position(|(_, f, _)| *f == family) else {
            panic!("no pending {family} query");
        };
        let (_, _, completion) = self.pending.remove(pos);
        completion(result);
    }
}

impl ResolveEngine for MockEngine {
    fn configure(&mut self, options: &EngineOptions) -> Result<(), ResolveError> {
        self.options = Some(options.clone());
        Ok(())
    }

    fn set_servers(&mut self, servers: &[SocketAddr]) -> Result<(), ResolveError> {
        self.servers = servers.to_vec();
        Ok(())
    }

    fn query_host(
        &mut self,
        _io: &mut dyn EngineIo,
        name: &str,
        family: AddressFamily,
        completion: SubQueryCompletion,
    ) {
        self.issued.push((name.to_string(), family));
        if let Some(result) = self.instant.get(&family) {
            completion(result.clone());
        } else {
            self.pending.push((name.to_string(), family, completion));
        }
    }

    fn process_fd(&mut self, _io: &mut dyn EngineIo, _read: Option<RawFd>, _write: Option<RawFd>) {}

    fn cancel(&mut self, _io: &mut dyn EngineIo) {
        for (_, _, completion) in self.pending.drain(..) {
            completion(Err(ResolveDriverError::Cancelled.into()));
        }
    }

    fn shutdown(&mut self, _io: &mut dyn EngineIo) {
        self.shutdown.store(true, Ordering::Release);
    }
}

pub fn start<E: ResolveEngine>(channel: &Channel<E>, name: &str) -> oneshot::Receiver<ResolveResult> {
    let (sender, receiver) = oneshot::channel();
    channel.resolve_with(name, move |r| {
        let _ = sender.send(r);
    });
    receiver
}

pub fn finish(channel: &Channel<MockEngine>, family: AddressFamily, result: SubQueryResult) {
    channel.with_native_handle(|engine, _io| engine.finish(family, result));
}

pub fn v4(last: u8) -> IpAddr {
    IpAddr::from([192, 0, 2, last])
}

pub fn v6(last: u16) -> IpAddr {
    IpAddr::from([0x2001, 0xdb8, 0, 0, 0, 0, 0, last])
}
