/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::slice;
use std::vec;

use crate::AddressFamily;

/// Ordered addresses collected for one resolve call.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResolvedAddrs {
    addrs: Vec<IpAddr>,
    last_family: Option<AddressFamily>,
}

impl ResolvedAddrs {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    /// Family of the records added most recently.
    #[inline]
    pub fn last_family(&self) -> Option<AddressFamily> {
        self.last_family
    }

    pub fn iter(&self) -> slice::Iter<'_, IpAddr> {
        self.addrs.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[IpAddr] {
        &self.addrs
    }

    pub fn into_vec(self) -> Vec<IpAddr> {
        self.addrs
    }

    pub(crate) fn append(&mut self, family: AddressFamily, records: Vec<IpAddr>) {
        if records.is_empty() {
            return;
        }
        self.addrs.extend(records);
        self.last_family = Some(family);
    }

    pub(crate) fn prepend(&mut self, family: AddressFamily, records: Vec<IpAddr>) {
        if records.is_empty() {
            return;
        }
        self.addrs.splice(0..0, records);
        self.last_family = Some(family);
    }
}

impl IntoIterator for ResolvedAddrs {
    type Item = IpAddr;
    type IntoIter = vec::IntoIter<IpAddr>;

    fn into_iter(self) -> Self::IntoIter {
        self.addrs.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResolvedAddrs {
    type Item = &'a IpAddr;
    type IntoIter = slice::Iter<'a, IpAddr>;

    fn into_iter(self) -> Self::IntoIter {
        self.addrs.iter()
    }
}
