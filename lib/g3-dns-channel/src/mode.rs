/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use crate::{AddressFamily, ChannelConfigError};

const FAMILIES_V4: &[AddressFamily] = &[AddressFamily::Ipv4];
const FAMILIES_V6: &[AddressFamily] = &[AddressFamily::Ipv6];
const FAMILIES_ALL: &[AddressFamily] = &[AddressFamily::Ipv4, AddressFamily::Ipv6];

/// Which address families a resolve call queries, and how the per family
/// results are merged.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum ResolveMode {
    /// Whichever family succeeds first wins, the other one is discarded.
    Unspecific = 0,
    Ipv4First = 1,
    Ipv6First = 2,
    /// Both families, in arrival order.
    #[default]
    Both = 3,
    Ipv4Only = 4,
    Ipv6Only = 5,
}

impl ResolveMode {
    pub fn families(self) -> &'static [AddressFamily] {
        match self {
            ResolveMode::Ipv4Only => FAMILIES_V4,
            ResolveMode::Ipv6Only => FAMILIES_V6,
            _ => FAMILIES_ALL,
        }
    }

    pub(crate) fn sub_query_count(self) -> usize {
        self.families().len()
    }

    /// The family whose records should be placed ahead of the other one.
    pub(crate) fn preferred_family(self) -> Option<AddressFamily> {
        match self {
            ResolveMode::Ipv4First => Some(AddressFamily::Ipv4),
            ResolveMode::Ipv6First => Some(AddressFamily::Ipv6),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveMode::Unspecific => "unspecific",
            ResolveMode::Ipv4First => "ipv4_first",
            ResolveMode::Ipv6First => "ipv6_first",
            ResolveMode::Both => "both",
            ResolveMode::Ipv4Only => "ipv4_only",
            ResolveMode::Ipv6Only => "ipv6_only",
        }
    }
}

impl fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolveMode {
    type Err = ChannelConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "unspecific" | "any" => Ok(ResolveMode::Unspecific),
            "ipv4first" | "ipv4_first" => Ok(ResolveMode::Ipv4First),
            "ipv6first" | "ipv6_first" => Ok(ResolveMode::Ipv6First),
            "both" => Ok(ResolveMode::Both),
            "ipv4only" | "ipv4_only" => Ok(ResolveMode::Ipv4Only),
            "ipv6only" | "ipv6_only" => Ok(ResolveMode::Ipv6Only),
            _ => Err(ChannelConfigError::InvalidResolveMode(s.to_string())),
        }
    }
}

impl TryFrom<u8> for ResolveMode {
    type Error = ChannelConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResolveMode::Unspecific),
            1 => Ok(ResolveMode::Ipv4First),
            2 => Ok(ResolveMode::Ipv6First),
            3 => Ok(ResolveMode::Both),
            4 => Ok(ResolveMode::Ipv4Only),
            5 => Ok(ResolveMode::Ipv6Only),
            _ => Err(ChannelConfigError::InvalidResolveMode(value.to_string())),
        }
    }
}
