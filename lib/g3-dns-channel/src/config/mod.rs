/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::{ChannelConfigError, EngineOptions, ResolveMode};

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(3000);
const MINIMUM_QUERY_TIMEOUT: Duration = Duration::from_millis(2);
const DEFAULT_DNS_PORT: u16 = 53;
const ENGINE_LOOKUPS: &str = "bf";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChannelConfig {
    pub(crate) query_timeout: Duration,
    pub(crate) tries: u32,
    pub(crate) rotate: bool,
    pub(crate) servers: Vec<SocketAddr>,
    pub(crate) resolve_mode: ResolveMode,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            tries: 1,
            rotate: false,
            servers: Vec::new(),
            resolve_mode: ResolveMode::default(),
        }
    }
}

impl ChannelConfig {
    pub fn set_query_timeout(&mut self, timeout: Duration) {
        self.query_timeout = timeout;
    }

    #[inline]
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn set_tries(&mut self, tries: u32) {
        self.tries = tries;
    }

    pub fn set_rotate(&mut self, rotate: bool) {
        self.rotate = rotate;
    }

    pub fn set_resolve_mode(&mut self, mode: ResolveMode) {
        self.resolve_mode = mode;
    }

    #[inline]
    pub fn resolve_mode(&self) -> ResolveMode {
        self.resolve_mode
    }

    pub fn add_server(&mut self, addr: &str) -> Result<(), ChannelConfigError> {
        let addr = parse_server(addr)?;
        self.servers.push(addr);
        Ok(())
    }

    /// Replace the server list by a comma or space separated list.
    pub fn set_servers_csv(&mut self, csv: &str) -> Result<(), ChannelConfigError> {
        self.servers = parse_server_list(csv)?;
        Ok(())
    }

    #[inline]
    pub fn servers(&self) -> &[SocketAddr] {
        &self.servers
    }

    pub fn check(&self) -> Result<(), ChannelConfigError> {
        if self.query_timeout < MINIMUM_QUERY_TIMEOUT {
            return Err(ChannelConfigError::InvalidTimeout("too small"));
        }
        if self.tries == 0 {
            return Err(ChannelConfigError::InvalidTries);
        }
        Ok(())
    }

    pub(crate) fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            timeout: self.query_timeout,
            tries: self.tries,
            rotate: self.rotate,
            lookups: ENGINE_LOOKUPS.to_string(),
        }
    }

    /// Interval of the timer that drives engine timeouts.
    pub(crate) fn timer_period(&self) -> Duration {
        self.query_timeout / 2
    }
}

pub(crate) fn parse_server(s: &str) -> Result<SocketAddr, ChannelConfigError> {
    let s = s.trim();
    let addr = if let Ok(addr) = SocketAddr::from_str(s) {
        addr
    } else if let Ok(ip) = IpAddr::from_str(s) {
        SocketAddr::new(ip, DEFAULT_DNS_PORT)
    } else {
        return Err(ChannelConfigError::InvalidServer(s.to_string()));
    };
    if addr.ip().is_unspecified() || addr.port() == 0 {
        return Err(ChannelConfigError::InvalidServer(s.to_string()));
    }
    Ok(addr)
}

pub(crate) fn parse_server_list(csv: &str) -> Result<Vec<SocketAddr>, ChannelConfigError> {
    let mut servers = Vec::new();
    for s in csv
        .split(|c: char| c == ',' || c.is_ascii_whitespace())
        .filter(|s| !s.is_empty())
    {
        servers.push(parse_server(s)?);
    }
    if servers.is_empty() {
        return Err(ChannelConfigError::EmptyServerList);
    }
    Ok(servers)
}
