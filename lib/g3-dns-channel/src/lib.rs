/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Drive a DNS protocol engine on the tokio reactor.
//!
//! The engine, see [`ResolveEngine`], does all the protocol work. This crate
//! supplies it with sockets registered on the reactor, runs its timeout
//! processing on a periodic timer, and splits each resolve call into one
//! query per address family, merging the answers by [`ResolveMode`].

mod error;
pub use error::{
    ChannelConfigError, ResolveDriverError, ResolveError, ResolveLocalError, ResolveServerError,
};

mod family;
pub use family::AddressFamily;

mod mode;
pub use mode::ResolveMode;

mod engine;
pub use engine::{EngineIo, EngineOptions, ResolveEngine, SocketType, SubQueryCompletion};

mod config;
pub use config::ChannelConfig;

mod stats;
pub use stats::{ChannelSnapshot, ChannelStats};

mod result;
pub use result::ResolvedAddrs;

mod aggregate;
pub use aggregate::ResolveResult;

mod timer;
mod accountant;
mod socket;

mod channel;
pub use channel::Channel;
