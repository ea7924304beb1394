/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use g3_dns_channel::{
    AddressFamily, Channel, ChannelConfig, ChannelConfigError, EngineOptions, ResolveDriverError,
    ResolveError, ResolveMode, ResolveServerError,
};

mod common;
use common::{MockEngine, finish, start, v4, v6};

fn new_channel(mode: ResolveMode) -> Channel<MockEngine> {
    let mut config = ChannelConfig::default();
    config.set_resolve_mode(mode);
    Channel::new(MockEngine::default(), &config).unwrap()
}

#[tokio::test]
async fn both_keeps_arrival_order() {
    let channel = new_channel(ResolveMode::Both);
    let receiver = start(&channel, "www.example.net");
    assert_eq!(channel.outstanding(), 2);

    finish(&channel, AddressFamily::Ipv6, Ok(vec![v6(1)]));
    finish(&channel, AddressFamily::Ipv4, Ok(vec![v4(1), v4(2)]));
    let addrs = receiver.await.unwrap().unwrap();
    assert_eq!(addrs.as_slice(), &[v6(1), v4(1), v4(2)]);
    assert_eq!(channel.outstanding(), 0);
}

#[tokio::test]
async fn ipv4_first_reorders() {
    let channel = new_channel(ResolveMode::Ipv4First);
    let receiver = start(&channel, "www.example.net");

    finish(&channel, AddressFamily::Ipv6, Ok(vec![v6(1)]));
    finish(&channel, AddressFamily::Ipv4, Ok(vec![v4(1)]));
    let addrs = receiver.await.unwrap().unwrap();
    assert_eq!(addrs.as_slice(), &[v4(1), v6(1)]);
}

#[tokio::test]
async fn ipv6_first_partial_failure() {
    let channel = new_channel(ResolveMode::Ipv6First);
    let receiver = start(&channel, "www.example.net");

    finish(&channel, AddressFamily::Ipv6, Err(ResolveServerError::ServFail.into()));
    finish(&channel, AddressFamily::Ipv4, Ok(vec![v4(1)]));
    let addrs = receiver.await.unwrap().unwrap();
    assert_eq!(addrs.as_slice(), &[v4(1)]);
    assert_eq!(channel.stats().snapshot().sub_query_failed, 1);
}

#[tokio::test]
async fn unspecific_first_success_wins() {
    let channel = new_channel(ResolveMode::Unspecific);
    let receiver = start(&channel, "www.example.net");

    finish(&channel, AddressFamily::Ipv6, Ok(vec![v6(1)]));
    let addrs = receiver.await.unwrap().unwrap();
    assert_eq!(addrs.as_slice(), &[v6(1)]);
    assert_eq!(channel.outstanding(), 1);

    finish(&channel, AddressFamily::Ipv4, Ok(vec![v4(1)]));
    assert_eq!(channel.outstanding(), 0);
}

#[tokio::test]
async fn only_mode_has_no_fallback() {
    let channel = new_channel(ResolveMode::Ipv4Only);
    let receiver = start(&channel, "www.example.net");
    assert_eq!(channel.outstanding(), 1);
    channel.with_native_handle(|engine, _io| {
        assert_eq!(
            engine.issued,
            vec![("www.example.net".to_string(), AddressFamily::Ipv4)]
        );
    });

    finish(&channel, AddressFamily::Ipv4, Err(ResolveServerError::NotFound.into()));
    let e = receiver.await.unwrap().unwrap_err();
    assert_eq!(e, ResolveError::FromServer(ResolveServerError::NotFound));
}

#[tokio::test]
async fn all_failed_reports_last_error() {
    let channel = new_channel(ResolveMode::Both);
    let receiver = start(&channel, "www.example.net");

    finish(&channel, AddressFamily::Ipv4, Err(ResolveServerError::NotFound.into()));
    finish(&channel, AddressFamily::Ipv6, Err(ResolveDriverError::Timeout.into()));
    let e = receiver.await.unwrap().unwrap_err();
    assert_eq!(e, ResolveError::FromDriver(ResolveDriverError::Timeout));
}

#[tokio::test]
async fn empty_domain() {
    let channel = new_channel(ResolveMode::Both);
    let e = channel.resolve("").await.unwrap_err();
    assert_eq!(e, ResolveError::EmptyDomain);
    assert_eq!(channel.outstanding(), 0);
    channel.with_native_handle(|engine, _io| assert!(engine.issued.is_empty()));
}

#[tokio::test]
async fn synchronous_completion() {
    let mut engine = MockEngine::default();
    engine.instant.insert(AddressFamily::Ipv4, Ok(vec![v4(7)]));
    engine.instant.insert(AddressFamily::Ipv6, Ok(vec![]));
    let channel = Channel::new(engine, &ChannelConfig::default()).unwrap();

    let addrs = channel.resolve("www.example.net").await.unwrap();
    assert_eq!(addrs.as_slice(), &[v4(7)]);
    assert_eq!(channel.outstanding(), 0);

    // each answer takes the count back to zero before the next query
    let snap = channel.stats().snapshot();
    assert_eq!(snap.timer_started, 2);
    assert_eq!(snap.timer_stopped, 2);
}

#[tokio::test]
async fn timer_follows_outstanding_count() {
    let channel = new_channel(ResolveMode::Both);
    let receivers = (0..3)
        .map(|_| start(&channel, "www.example.net"))
        .collect::<Vec<_>>();
    assert_eq!(channel.outstanding(), 6);

    let snap = channel.stats().snapshot();
    assert_eq!(snap.resolve_total, 3);
    assert_eq!(snap.sub_query_total, 6);
    assert_eq!(snap.timer_started, 1);
    assert_eq!(snap.timer_stopped, 0);

    for _ in 0..3 {
        finish(&channel, AddressFamily::Ipv4, Ok(vec![v4(1)]));
        finish(&channel, AddressFamily::Ipv6, Ok(vec![v6(1)]));
    }
    for receiver in receivers {
        assert_eq!(receiver.await.unwrap().unwrap().len(), 2);
    }
    assert_eq!(channel.outstanding(), 0);

    let snap = channel.stats().snapshot();
    assert_eq!(snap.timer_started, 1);
    assert_eq!(snap.timer_stopped, 1);

    // a new request after going idle starts it again
    let receiver = start(&channel, "www.example.net");
    assert_eq!(channel.stats().snapshot().timer_started, 2);
    channel.cancel();
    assert!(receiver.await.unwrap().unwrap_err().is_cancelled());
    assert_eq!(channel.stats().snapshot().timer_stopped, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submission() {
    let channel = Arc::new(new_channel(ResolveMode::Both));

    let submit = (0..32)
        .map(|i| {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move { start(&channel, &format!("host{i}.example.net")) })
        })
        .collect::<Vec<_>>();
    let mut receivers = Vec::with_capacity(submit.len());
    for task in submit {
        receivers.push(task.await.unwrap());
    }
    assert_eq!(channel.outstanding(), 64);
    let snap = channel.stats().snapshot();
    assert_eq!(snap.sub_query_total, 64);
    assert_eq!(snap.timer_started, 1);

    let complete = (0..32)
        .map(|_| {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                finish(&channel, AddressFamily::Ipv6, Ok(vec![v6(1)]));
                finish(&channel, AddressFamily::Ipv4, Ok(vec![v4(1)]));
            })
        })
        .collect::<Vec<_>>();
    for task in complete {
        task.await.unwrap();
    }
    for receiver in receivers {
        assert_eq!(receiver.await.unwrap().unwrap().len(), 2);
    }

    assert_eq!(channel.outstanding(), 0);
    let snap = channel.stats().snapshot();
    assert_eq!(snap.timer_started, 1);
    assert_eq!(snap.timer_stopped, 1);
}

#[tokio::test]
async fn cancel_reports_once() {
    let channel = new_channel(ResolveMode::Both);
    let called = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
    for _ in 0..2 {
        let called = Arc::clone(&called);
        let sender = sender.clone();
        channel.resolve_with("www.example.net", move |r| {
            called.fetch_add(1, Ordering::Relaxed);
            let _ = sender.send(r);
        });
    }
    drop(sender);

    channel.cancel();
    assert_eq!(channel.outstanding(), 0);

    let mut receiver = receiver;
    while let Some(r) = receiver.recv().await {
        assert!(r.unwrap_err().is_cancelled());
    }
    assert_eq!(called.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn drop_cancels_and_shuts_down() {
    let channel = new_channel(ResolveMode::Ipv6Only);
    let shutdown = channel.with_native_handle(|engine, _io| Arc::clone(&engine.shutdown));
    let receiver = start(&channel, "www.example.net");

    drop(channel);
    assert!(shutdown.load(Ordering::Acquire));
    assert!(receiver.await.unwrap().unwrap_err().is_cancelled());
}

#[tokio::test]
async fn resolve_mode_setters() {
    let channel = new_channel(ResolveMode::Both);
    assert_eq!(channel.resolve_mode(), ResolveMode::Both);

    channel.set_resolve_mode_str("ipv6_first").unwrap();
    assert_eq!(channel.resolve_mode(), ResolveMode::Ipv6First);
    channel.set_resolve_mode(ResolveMode::Ipv4Only);
    assert_eq!(channel.resolve_mode(), ResolveMode::Ipv4Only);

    assert!(matches!(
        channel.set_resolve_mode_str("ipv5_only"),
        Err(ChannelConfigError::InvalidResolveMode(_))
    ));
    assert!(channel.set_resolve_mode_raw(9).is_err());
    assert_eq!(channel.resolve_mode(), ResolveMode::Ipv4Only);

    // the mode is captured when the request is issued
    let receiver = start(&channel, "www.example.net");
    channel.set_resolve_mode(ResolveMode::Both);
    assert_eq!(channel.outstanding(), 1);
    finish(&channel, AddressFamily::Ipv4, Ok(vec![v4(1)]));
    assert_eq!(receiver.await.unwrap().unwrap().as_slice(), &[v4(1)]);
}

#[tokio::test]
async fn servers_and_options() {
    let mut config = ChannelConfig::default();
    config.set_query_timeout(Duration::from_secs(5));
    config.set_tries(2);
    config.add_server("192.0.2.53").unwrap();
    let channel = Channel::new(MockEngine::default(), &config).unwrap();

    channel.with_native_handle(|engine, _io| {
        assert_eq!(
            engine.options,
            Some(EngineOptions {
                timeout: Duration::from_secs(5),
                tries: 2,
                rotate: false,
                lookups: "bf".to_string(),
            })
        );
        assert_eq!(
            engine.servers,
            vec![SocketAddr::from_str("192.0.2.53:53").unwrap()]
        );
    });

    channel
        .set_servers_csv("192.0.2.1, [2001:db8::1]:5353")
        .unwrap();
    assert!(channel.set_servers_csv("192.0.2.1,not-an-ip").is_err());
    assert!(channel.set_servers_csv("").is_err());
    channel.with_native_handle(|engine, _io| {
        assert_eq!(
            engine.servers,
            vec![
                SocketAddr::from_str("192.0.2.1:53").unwrap(),
                SocketAddr::from_str("[2001:db8::1]:5353").unwrap(),
            ]
        );
    });
}

#[test]
fn no_runtime() {
    let r = Channel::new(MockEngine::default(), &ChannelConfig::default());
    assert!(matches!(r, Err(ChannelConfigError::NoRuntime)));
}

#[test]
fn invalid_config() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let mut config = ChannelConfig::default();
    config.set_tries(0);
    let r = Channel::with_runtime(MockEngine::default(), &config, rt.handle().clone());
    assert!(matches!(r, Err(ChannelConfigError::InvalidTries)));

    let shutdown = Arc::new(AtomicBool::new(false));
    let engine = MockEngine {
        shutdown: Arc::clone(&shutdown),
        ..Default::default()
    };
    let channel = Channel::with_runtime(engine, &ChannelConfig::default(), rt.handle().clone());
    assert!(channel.is_ok());
    drop(channel);
    assert!(shutdown.load(Ordering::Acquire));
}
