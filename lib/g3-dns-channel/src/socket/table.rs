/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;
use std::io::{self, IoSlice};
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::sync::{Arc, Weak};

use log::{debug, warn};
use socket2::Protocol;
use tokio::runtime::Handle;

use super::{FdProcessor, SocketHandle};
use crate::{AddressFamily, ChannelStats, EngineIo, SocketType};

/// The socket primitives handed to the engine, and the registry of the
/// sockets it currently has open.
pub(crate) struct SocketTable {
    rt: Handle,
    processor: Weak<dyn FdProcessor>,
    sockets: HashMap<RawFd, Arc<SocketHandle>>,
    stats: Arc<ChannelStats>,
}

impl SocketTable {
    pub(crate) fn new(rt: Handle, processor: Weak<dyn FdProcessor>, stats: Arc<ChannelStats>) -> Self {
        SocketTable {
            rt,
            processor,
            sockets: HashMap::new(),
            stats,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sockets.len()
    }

    pub(crate) fn contains(&self, fd: RawFd) -> bool {
        self.sockets.contains_key(&fd)
    }

    fn get(&self, fd: RawFd) -> &Arc<SocketHandle> {
        self.sockets
            .get(&fd)
            .unwrap_or_else(|| panic!("socket {fd} is not registered in this channel"))
    }

    /// Close every socket the engine left behind.
    pub(crate) fn close_all(&mut self) {
        for (fd, handle) in self.sockets.drain() {
            debug!("closing left over socket {fd}");
            handle.close();
            self.stats.add_socket_closed();
        }
    }
}

impl EngineIo for SocketTable {
    fn open_socket(
        &mut self,
        family: AddressFamily,
        kind: SocketType,
        protocol: Option<Protocol>,
    ) -> io::Result<RawFd> {
        let _guard = self.rt.enter();
        let handle = SocketHandle::open(family, kind, protocol).inspect_err(|e| {
            debug!("failed to open {family} {kind:?} socket: {e}");
        })?;
        let fd = handle.native_fd();
        if let Some(old) = self.sockets.insert(fd, handle) {
            warn!("socket {fd} was still registered when reopened");
            old.close();
        }
        self.stats.add_socket_opened();
        debug!("opened {family} {kind:?} socket {fd}");
        Ok(fd)
    }

    fn close_socket(&mut self, fd: RawFd) -> io::Result<()> {
        let Some(handle) = self.sockets.remove(&fd) else {
            panic!("socket {fd} is not registered in this channel");
        };
        handle.close();
        self.stats.add_socket_closed();
        debug!("closed {:?} socket {fd}", handle.kind());
        Ok(())
    }

    fn connect_socket(&self, fd: RawFd, addr: SocketAddr) -> io::Result<()> {
        self.get(fd).connect(addr)
    }

    fn recv_from(
        &self,
        fd: RawFd,
        buf: &mut [u8],
        flags: i32,
    ) -> io::Result<(usize, Option<SocketAddr>)> {
        self.get(fd).recv(buf, flags)
    }

    fn send_vectored(&self, fd: RawFd, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        self.get(fd).send(bufs)
    }

    fn socket_state_changed(&mut self, fd: RawFd, readable: bool, writable: bool) {
        let handle = self.get(fd);
        handle.cancel();

        if !readable && !writable {
            return;
        }
        let Some(processor) = self.processor.upgrade() else {
            return;
        };
        if readable {
            let processor = Arc::clone(&processor);
            handle.wait_readable(&self.rt, move || processor.process_fd(Some(fd), None));
        }
        if writable {
            handle.wait_writable(&self.rt, move || processor.process_fd(None, Some(fd)));
        }
    }
}
