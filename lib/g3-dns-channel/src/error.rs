/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveServerError {
    #[error("server claims query was malformed")]
    FormErr,
    #[error("server returned general failure")]
    ServFail,
    #[error("server claims domain name not found")]
    NotFound,
    #[error("server does not implement requested operation")]
    NotImp,
    #[error("server refused query")]
    Refused,
}

impl ResolveServerError {
    pub fn get_type(&self) -> &str {
        match self {
            ResolveServerError::FormErr => "FORMERR",
            ResolveServerError::ServFail => "SERVFAIL",
            ResolveServerError::NotFound => "NOTFOUND",
            ResolveServerError::NotImp => "NOTIMP",
            ResolveServerError::Refused => "REFUSED",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveDriverError {
    #[error("malformed DNS query")]
    BadQuery,
    #[error("malformed domain name")]
    BadName,
    #[error("unsupported address family")]
    BadFamily,
    #[error("malformed DNS reply")]
    BadResp,
    #[error("connection refused by server")]
    ConnRefused,
    #[error("timeout while contacting server")]
    Timeout,
    #[error("query cancelled")]
    Cancelled,
    #[error("no address found")]
    NoAddress,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResolveDriverError {
    pub fn get_type(&self) -> &str {
        match self {
            ResolveDriverError::BadQuery => "BadQuery",
            ResolveDriverError::BadName => "BadName",
            ResolveDriverError::BadFamily => "BadFamily",
            ResolveDriverError::BadResp => "BadResp",
            ResolveDriverError::ConnRefused => "ConnRefused",
            ResolveDriverError::Timeout => "Timeout",
            ResolveDriverError::Cancelled => "Cancelled",
            ResolveDriverError::NoAddress => "NoAddress",
            ResolveDriverError::Internal(_) => "InternalError",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveLocalError {
    #[error("no channel running")]
    NoChannelRunning,
}

impl ResolveLocalError {
    pub fn get_type(&self) -> &str {
        match self {
            ResolveLocalError::NoChannelRunning => "NoChannelRunning",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("empty domain")]
    EmptyDomain,
    #[error("server error: {0}")]
    FromServer(#[from] ResolveServerError),
    #[error("driver error: {0}")]
    FromDriver(#[from] ResolveDriverError),
    #[error("local error: {0}")]
    FromLocal(#[from] ResolveLocalError),
}

impl ResolveError {
    pub fn get_type(&self) -> &str {
        match self {
            ResolveError::EmptyDomain => "EmptyDomain",
            ResolveError::FromServer(_) => "ServerError",
            ResolveError::FromDriver(_) => "DriverError",
            ResolveError::FromLocal(_) => "LocalError",
        }
    }

    pub fn get_subtype(&self) -> &str {
        match self {
            ResolveError::EmptyDomain => "",
            ResolveError::FromServer(e) => e.get_type(),
            ResolveError::FromDriver(e) => e.get_type(),
            ResolveError::FromLocal(e) => e.get_type(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResolveError::FromDriver(ResolveDriverError::Cancelled))
    }
}

/// Errors returned synchronously by channel construction and setters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelConfigError {
    #[error("invalid resolve mode {0}")]
    InvalidResolveMode(String),
    #[error("invalid server address {0}")]
    InvalidServer(String),
    #[error("empty server list")]
    EmptyServerList,
    #[error("invalid query timeout: {0}")]
    InvalidTimeout(&'static str),
    #[error("tries should not be zero")]
    InvalidTries,
    #[error("no tokio runtime available")]
    NoRuntime,
    #[error("rejected by engine: {0}")]
    Engine(#[from] ResolveError),
}
