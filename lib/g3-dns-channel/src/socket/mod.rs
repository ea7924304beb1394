/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::os::fd::RawFd;

mod handle;
use handle::SocketHandle;

mod table;
pub(crate) use table::SocketTable;

/// Receiver of readiness events from the socket waits.
pub(crate) trait FdProcessor: Send + Sync {
    fn process_fd(&self, read_fd: Option<RawFd>, write_fd: Option<RawFd>);
}
