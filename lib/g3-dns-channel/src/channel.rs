/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::os::fd::RawFd;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use log::debug;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::accountant::RequestAccountant;
use crate::aggregate::{PendingRequest, ResolveCallback, ResolveResult};
use crate::config::parse_server_list;
use crate::socket::{FdProcessor, SocketTable};
use crate::timer::TimerFire;
use crate::{
    AddressFamily, ChannelConfig, ChannelConfigError, ChannelStats, EngineIo, ResolveEngine,
    ResolveError, ResolveLocalError, ResolveMode, SubQueryCompletion,
};

struct ChannelState<E> {
    engine: E,
    sockets: SocketTable,
}

struct ChannelShared<E> {
    rt: Handle,
    /// Every call into the engine, and so every change of the socket
    /// registry, happens with this lock held.
    state: Mutex<ChannelState<E>>,
    accountant: RequestAccountant,
    resolve_mode: AtomicU8,
    stats: Arc<ChannelStats>,
}

/// Resolve names through a [`ResolveEngine`] driven by the tokio reactor.
///
/// Each call to [`Channel::resolve`] is split into one sub query per address
/// family required by the current [`ResolveMode`], and the results are merged
/// according to that mode. The channel must be created within a tokio
/// runtime, all sockets, waits and timers of it live on that runtime.
///
/// Dropping the channel cancels all pending queries and shuts the engine
/// down.
pub struct Channel<E: ResolveEngine> {
    shared: Arc<ChannelShared<E>>,
}

impl<E: ResolveEngine> Channel<E> {
    pub fn new(engine: E, config: &ChannelConfig) -> Result<Self, ChannelConfigError> {
        let rt = Handle::try_current().map_err(|_| ChannelConfigError::NoRuntime)?;
        Self::with_runtime(engine, config, rt)
    }

    pub fn with_runtime(
        mut engine: E,
        config: &ChannelConfig,
        rt: Handle,
    ) -> Result<Self, ChannelConfigError> {
        config.check()?;
        engine.configure(&config.engine_options())?;
        if !config.servers().is_empty() {
            engine.set_servers(config.servers())?;
        }

        let stats = Arc::new(ChannelStats::default());
        let shared = Arc::new_cyclic(|weak: &Weak<ChannelShared<E>>| {
            let processor: Weak<dyn FdProcessor> = weak.clone();
            ChannelShared {
                rt: rt.clone(),
                state: Mutex::new(ChannelState {
                    engine,
                    sockets: SocketTable::new(rt.clone(), processor, Arc::clone(&stats)),
                }),
                accountant: RequestAccountant::new(config.timer_period(), Arc::clone(&stats)),
                resolve_mode: AtomicU8::new(config.resolve_mode() as u8),
                stats,
            }
        });
        Ok(Channel { shared })
    }

    pub async fn resolve(&self, name: &str) -> ResolveResult {
        let (sender, receiver) = oneshot::channel();
        self.resolve_with(name, move |r| {
            let _ = sender.send(r);
        });
        receiver
            .await
            .unwrap_or_else(|_| Err(ResolveLocalError::NoChannelRunning.into()))
    }

    /// Like [`Channel::resolve`], but report through `callback`, which is
    /// always run as a separate task on the channel runtime.
    pub fn resolve_with<F>(&self, name: &str, callback: F)
    where
        F: FnOnce(ResolveResult) + Send + 'static,
    {
        self.shared.resolve(name, Box::new(callback));
    }

    /// Abort all queries in the engine. Their callbacks still run, with a
    /// cancelled error unless they got an answer already.
    pub fn cancel(&self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            let ChannelState { engine, sockets } = &mut *state;
            engine.cancel(sockets);
        }
        self.shared.accountant.stop_timer();
    }

    /// Set the servers from a comma or space separated list. The engine keeps
    /// its previous servers if the list is invalid.
    pub fn set_servers_csv(&self, csv: &str) -> Result<(), ChannelConfigError> {
        let servers = parse_server_list(csv)?;
        let mut state = self.shared.state.lock().unwrap();
        state.engine.set_servers(&servers)?;
        Ok(())
    }

    pub fn set_resolve_mode(&self, mode: ResolveMode) {
        self.shared.resolve_mode.store(mode as u8, Ordering::Release);
    }

    pub fn set_resolve_mode_str(&self, mode: &str) -> Result<(), ChannelConfigError> {
        let mode = mode.parse::<ResolveMode>()?;
        self.set_resolve_mode(mode);
        Ok(())
    }

    pub fn set_resolve_mode_raw(&self, mode: u8) -> Result<(), ChannelConfigError> {
        let mode = ResolveMode::try_from(mode)?;
        self.set_resolve_mode(mode);
        Ok(())
    }

    pub fn resolve_mode(&self) -> ResolveMode {
        self.shared.resolve_mode()
    }

    /// Direct access to the engine.
    ///
    /// `f` runs with the channel lock held, it must not call any method of
    /// this channel other than [`Channel::resolve_mode`] and
    /// [`Channel::stats`].
    pub fn with_native_handle<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut E, &mut dyn EngineIo) -> R,
    {
        let mut state = self.shared.state.lock().unwrap();
        let ChannelState { engine, sockets } = &mut *state;
        f(engine, sockets as &mut dyn EngineIo)
    }

    pub fn stats(&self) -> Arc<ChannelStats> {
        Arc::clone(&self.shared.stats)
    }

    /// Number of sub queries the engine has not completed yet.
    pub fn outstanding(&self) -> usize {
        self.shared.accountant.outstanding()
    }

    pub fn open_sockets(&self) -> usize {
        self.shared.state.lock().unwrap().sockets.len()
    }

    pub fn is_socket_open(&self, fd: RawFd) -> bool {
        self.shared.state.lock().unwrap().sockets.contains(fd)
    }
}

impl<E: ResolveEngine> Drop for Channel<E> {
    fn drop(&mut self) {
        let Ok(mut state) = self.shared.state.lock() else {
            return;
        };
        let ChannelState { engine, sockets } = &mut *state;
        engine.cancel(sockets);
        engine.shutdown(sockets);
        sockets.close_all();
        drop(state);
        self.shared.accountant.stop_timer();
    }
}

impl<E: ResolveEngine> ChannelShared<E> {
    fn resolve_mode(&self) -> ResolveMode {
        ResolveMode::try_from(self.resolve_mode.load(Ordering::Acquire)).unwrap_or_default()
    }

    fn resolve(self: &Arc<Self>, name: &str, callback: ResolveCallback) {
        self.stats.add_resolve();
        if name.is_empty() {
            self.rt.spawn(async move { callback(Err(ResolveError::EmptyDomain)) });
            return;
        }

        let mode = self.resolve_mode();
        let pending = Arc::new(PendingRequest::new(mode, callback));
        let mut state = self.state.lock().unwrap();
        for &family in mode.families() {
            // counted before the engine sees the query, as it may complete
            // it right away
            self.accountant.add_request(|epoch, delay| {
                self.rt
                    .spawn(run_timer(Arc::clone(self), epoch, delay))
                    .abort_handle()
            });
            self.stats.add_sub_query();
            let completion = self.sub_query_completion(family, Arc::clone(&pending));
            let ChannelState { engine, sockets } = &mut *state;
            engine.query_host(sockets, name, family, completion);
        }
    }

    fn sub_query_completion(
        self: &Arc<Self>,
        family: AddressFamily,
        pending: Arc<PendingRequest>,
    ) -> SubQueryCompletion {
        let shared = Arc::clone(self);
        Box::new(move |result| {
            if let Err(e) = &result {
                shared.stats.add_sub_query_failed();
                debug!("{family} sub query failed: {e}");
            }
            if let Some((callback, result)) = pending.complete(family, result) {
                shared.rt.spawn(async move { callback(result) });
            }
            shared.accountant.remove_request();
        })
    }
}

impl<E: ResolveEngine> FdProcessor for ChannelShared<E> {
    fn process_fd(&self, read_fd: Option<RawFd>, write_fd: Option<RawFd>) {
        self.accountant.refresh_tick();
        let mut state = self.state.lock().unwrap();
        let ChannelState { engine, sockets } = &mut *state;
        engine.process_fd(sockets, read_fd, write_fd);
    }
}

async fn run_timer<E: ResolveEngine>(shared: Arc<ChannelShared<E>>, epoch: u64, delay: Duration) {
    let period = delay;
    let mut delay = delay;
    loop {
        tokio::time::sleep(delay).await;
        match shared.accountant.timer_fire(epoch) {
            TimerFire::Stale => return,
            TimerFire::Process => {
                shared.process_fd(None, None);
                delay = period;
            }
            TimerFire::Wait(left) => delay = left,
        }
        if !shared.accountant.timer_rearm(epoch) {
            return;
        }
    }
}
