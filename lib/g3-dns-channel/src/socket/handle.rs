/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, IoSlice, Write};
use std::mem::MaybeUninit;
use std::net::{Shutdown, SocketAddr};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::warn;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::{AddressFamily, SocketType};

#[derive(Clone, Copy, Debug)]
enum WaitDirection {
    Read,
    Write,
}

enum TransportSocket {
    Stream(AsyncFd<Socket>),
    Datagram(AsyncFd<Socket>),
}

impl TransportSocket {
    fn new(family: AddressFamily, kind: SocketType, protocol: Option<Protocol>) -> io::Result<Self> {
        let domain = Domain::from(family);
        match kind {
            SocketType::Stream => {
                let socket = new_nonblocking_socket(domain, Type::STREAM, protocol)?;
                Ok(TransportSocket::Stream(AsyncFd::new(socket)?))
            }
            SocketType::Datagram => {
                let socket = new_nonblocking_socket(domain, Type::DGRAM, protocol)?;
                Ok(TransportSocket::Datagram(AsyncFd::new(socket)?))
            }
        }
    }

    fn async_fd(&self) -> &AsyncFd<Socket> {
        match self {
            TransportSocket::Stream(s) => s,
            TransportSocket::Datagram(s) => s,
        }
    }

    fn kind(&self) -> SocketType {
        match self {
            TransportSocket::Stream(_) => SocketType::Stream,
            TransportSocket::Datagram(_) => SocketType::Datagram,
        }
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "illumos",
    target_os = "solaris",
))]
fn new_nonblocking_socket(
    domain: Domain,
    ty: Type,
    protocol: Option<Protocol>,
) -> io::Result<Socket> {
    Socket::new(domain, ty.nonblocking(), protocol)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "illumos",
    target_os = "solaris",
)))]
fn new_nonblocking_socket(
    domain: Domain,
    ty: Type,
    protocol: Option<Protocol>,
) -> io::Result<Socket> {
    let socket = Socket::new(domain, ty, protocol)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

fn as_uninit_slice(buf: &mut [u8]) -> &mut [MaybeUninit<u8>] {
    // SAFETY: MaybeUninit<u8> has the same layout as u8, and the socket2 recv
    // functions only write initialized bytes, never de-initialize any
    unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) }
}

/// One socket opened on behalf of the engine.
///
/// Waits registered through [`SocketHandle::wait_readable`] and
/// [`SocketHandle::wait_writable`] are persistent: the callback runs once per
/// readiness event and the wait is armed again afterwards, until
/// [`SocketHandle::cancel`] or [`SocketHandle::close`] is called. Each wait
/// task holds its own `Arc` to the handle, so the socket stays valid for it
/// even after the handle has left the registry.
pub(crate) struct SocketHandle {
    fd: RawFd,
    transport: TransportSocket,
    generation: AtomicU64,
    closed: AtomicBool,
    waits: Mutex<Vec<AbortHandle>>,
}

impl SocketHandle {
    /// Must be called within a tokio runtime context.
    pub(crate) fn open(
        family: AddressFamily,
        kind: SocketType,
        protocol: Option<Protocol>,
    ) -> io::Result<Arc<Self>> {
        let transport = TransportSocket::new(family, kind, protocol)?;
        let fd = transport.async_fd().as_raw_fd();
        Ok(Arc::new(SocketHandle {
            fd,
            transport,
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            waits: Mutex::new(Vec::with_capacity(2)),
        }))
    }

    #[inline]
    pub(crate) fn native_fd(&self) -> RawFd {
        self.fd
    }

    #[inline]
    pub(crate) fn kind(&self) -> SocketType {
        self.transport.kind()
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn is_armed(&self, generation: u64) -> bool {
        !self.is_closed() && self.generation.load(Ordering::Acquire) == generation
    }

    pub(crate) fn connect(&self, addr: SocketAddr) -> io::Result<()> {
        self.transport.async_fd().get_ref().connect(&SockAddr::from(addr))
    }

    /// A `WouldBlock` clears the cached read readiness of the socket.
    pub(crate) fn recv(&self, buf: &mut [u8], flags: i32) -> io::Result<(usize, Option<SocketAddr>)> {
        match &self.transport {
            TransportSocket::Stream(s) => s.try_io(Interest::READABLE, |socket| {
                let nr = socket.recv_with_flags(as_uninit_slice(buf), flags)?;
                let peer = socket.peer_addr().ok().and_then(|a| a.as_socket());
                Ok((nr, peer))
            }),
            TransportSocket::Datagram(s) => s.try_io(Interest::READABLE, |socket| {
                let (nr, from) = socket.recv_from_with_flags(as_uninit_slice(buf), flags)?;
                Ok((nr, from.as_socket()))
            }),
        }
    }

    /// A `WouldBlock` clears the cached write readiness of the socket, which
    /// is what parks the writable wait until the next edge.
    pub(crate) fn send(&self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        match &self.transport {
            TransportSocket::Stream(s) => s.try_io(Interest::WRITABLE, |socket| {
                let mut socket = socket;
                socket.write_vectored(bufs)
            }),
            TransportSocket::Datagram(s) => {
                s.try_io(Interest::WRITABLE, |socket| socket.send_vectored(bufs))
            }
        }
    }

    /// Drop all pending waits without calling them back.
    pub(crate) fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let mut waits = self.waits.lock().unwrap();
        for task in waits.drain(..) {
            task.abort();
        }
    }

    /// The descriptor itself is released once the last in-flight wait has
    /// dropped its reference.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.cancel();
        if let TransportSocket::Stream(s) = &self.transport {
            let _ = s.get_ref().shutdown(Shutdown::Both);
        }
    }

    pub(crate) fn wait_readable<F>(self: &Arc<Self>, rt: &Handle, on_ready: F)
    where
        F: Fn() + Send + 'static,
    {
        self.spawn_wait(rt, WaitDirection::Read, on_ready);
    }

    pub(crate) fn wait_writable<F>(self: &Arc<Self>, rt: &Handle, on_ready: F)
    where
        F: Fn() + Send + 'static,
    {
        self.spawn_wait(rt, WaitDirection::Write, on_ready);
    }

    fn spawn_wait<F>(self: &Arc<Self>, rt: &Handle, direction: WaitDirection, on_ready: F)
    where
        F: Fn() + Send + 'static,
    {
        if self.is_closed() {
            return;
        }
        let handle = Arc::clone(self);
        let generation = self.generation.load(Ordering::Acquire);
        let task = rt.spawn(async move {
            let async_fd = handle.transport.async_fd();
            loop {
                let ready = match direction {
                    WaitDirection::Read => async_fd.readable().await,
                    WaitDirection::Write => async_fd.writable().await,
                };
                let mut guard = match ready {
                    Ok(guard) => guard,
                    Err(e) => {
                        if handle.is_armed(generation) {
                            warn!("{direction:?} wait on socket {} failed: {e}", handle.fd);
                        }
                        return;
                    }
                };
                if !handle.is_armed(generation) {
                    return;
                }

                on_ready();

                match direction {
                    WaitDirection::Read => {
                        // keep the readiness only if there is still data queued
                        let _ = guard.try_io(|fd| {
                            let mut probe = [MaybeUninit::<u8>::uninit(); 1];
                            fd.get_ref().peek(&mut probe)
                        });
                    }
                    WaitDirection::Write => {
                        // still writable until a send hits WouldBlock
                        drop(guard);
                        tokio::task::yield_now().await;
                    }
                }
            }
        });
        self.waits.lock().unwrap().push(task.abort_handle());
    }
}
