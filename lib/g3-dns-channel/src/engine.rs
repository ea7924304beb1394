/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! The boundary with the DNS protocol engine.
//!
//! The engine owns message construction, parsing, server selection and the
//! retry policy of each query. It never touches the network on its own: every
//! socket it needs is opened and driven through the [`EngineIo`] table that
//! is passed into each of its entry points, and it reports the interest it has
//! in each socket through [`EngineIo::socket_state_changed`].

use std::io::{self, IoSlice};
use std::net::{IpAddr, SocketAddr};
use std::os::fd::RawFd;
use std::time::Duration;

use socket2::Protocol;

use crate::{AddressFamily, ResolveError};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SocketType {
    Stream,
    Datagram,
}

/// Called exactly once per sub query, from inside one of the engine's entry
/// points.
pub type SubQueryCompletion = Box<dyn FnOnce(Result<Vec<IpAddr>, ResolveError>) + Send>;

/// Options the channel hands to the engine at construction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EngineOptions {
    pub timeout: Duration,
    pub tries: u32,
    pub rotate: bool,
    /// `b` for DNS lookups, `f` for the hosts file.
    pub lookups: String,
}

/// Socket primitives supplied to the engine.
///
/// Errors are reported as [`io::Error`] carrying the platform error code, the
/// engine decides whether to retry against another server. Operating on a
/// descriptor that was never opened through this table, or that has already
/// been closed, is a contract violation and panics.
pub trait EngineIo {
    fn open_socket(
        &mut self,
        family: AddressFamily,
        kind: SocketType,
        protocol: Option<Protocol>,
    ) -> io::Result<RawFd>;

    fn close_socket(&mut self, fd: RawFd) -> io::Result<()>;

    fn connect_socket(&self, fd: RawFd, addr: SocketAddr) -> io::Result<()>;

    /// Returns the number of bytes read and, if known, the remote address.
    fn recv_from(
        &self,
        fd: RawFd,
        buf: &mut [u8],
        flags: i32,
    ) -> io::Result<(usize, Option<SocketAddr>)>;

    fn send_vectored(&self, fd: RawFd, bufs: &[IoSlice<'_>]) -> io::Result<usize>;

    /// Replace the readiness interest of `fd`. Passing `false` for both stops
    /// watching it.
    fn socket_state_changed(&mut self, fd: RawFd, readable: bool, writable: bool);
}

pub trait ResolveEngine: Send + 'static {
    fn configure(&mut self, options: &EngineOptions) -> Result<(), ResolveError>;

    fn set_servers(&mut self, servers: &[SocketAddr]) -> Result<(), ResolveError>;

    /// Start a lookup of `name` in `family`. `completion` may be called before
    /// this returns.
    fn query_host(
        &mut self,
        io: &mut dyn EngineIo,
        name: &str,
        family: AddressFamily,
        completion: SubQueryCompletion,
    );

    /// Handle readiness of `read_fd` / `write_fd`, and run timeout based
    /// processing. Both are `None` when only timeouts should be checked.
    fn process_fd(&mut self, io: &mut dyn EngineIo, read_fd: Option<RawFd>, write_fd: Option<RawFd>);

    /// Abort all pending queries. Their completions must be called with
    /// [`crate::ResolveDriverError::Cancelled`].
    fn cancel(&mut self, io: &mut dyn EngineIo);

    /// Release every socket still held. Called once before the engine is
    /// dropped.
    fn shutdown(&mut self, io: &mut dyn EngineIo);
}
