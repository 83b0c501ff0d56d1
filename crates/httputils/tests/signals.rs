// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shutdown on real process signals
//!
//! Tests run in parallel in one process, so a runner may also see a signal
//! raised by another test listening for the same one. Every test still
//! raises its own signal after subscribing, and a foreign delivery only
//! triggers the same stop earlier.

#![cfg(unix)]

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use axum::{Router, routing::get};
use httputils::{HttpServer, InterruptSignal, Server, ShutdownConfig, ShutdownRunner};
use nix::sys::signal::{Signal, raise};
use tokio_util::sync::CancellationToken;

/// Give the runner time to register its signal streams
const SUBSCRIBE_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
#[error("listener refused to close")]
struct StopFailed;

#[derive(Debug, Default)]
struct CountingServer {
    stopped: CancellationToken,
    stop_calls: AtomicUsize,
    fail_stop: bool,
}

impl Server for CountingServer {
    type Error = StopFailed;

    async fn start(&self) -> Result<(), StopFailed> {
        self.stopped.cancelled().await;
        Ok(())
    }

    async fn stop(&self) -> Result<(), StopFailed> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stopped.cancel();
        if self.fail_stop {
            return Err(StopFailed);
        }
        Ok(())
    }
}

fn raise_later(signal: Signal) {
    tokio::spawn(async move {
        tokio::time::sleep(SUBSCRIBE_DELAY).await;
        raise(signal).expect("Failed to raise signal");
    });
}

#[tokio::test]
async fn configured_signal_stops_the_server() {
    let server = CountingServer::default();
    let runner = ShutdownRunner::new(ShutdownConfig::default())
        .with_signals([InterruptSignal::User1]);

    raise_later(Signal::SIGUSR1);

    assert!(runner.run(&server).await);
    assert_eq!(server.stop_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn signal_with_a_failing_stop_is_unclean() {
    let server = CountingServer {
        fail_stop: true,
        ..CountingServer::default()
    };
    let runner = ShutdownRunner::new(ShutdownConfig::default())
        .with_signals([InterruptSignal::User1]);

    raise_later(Signal::SIGUSR1);

    assert!(!runner.run(&server).await);
    assert_eq!(server.stop_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn signal_drains_a_live_http_server() {
    let router = Router::new().route("/", get(|| async { "up" }));
    let server = HttpServer::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0), router)
        .await
        .expect("Failed to bind test server");
    let url = format!("http://{}/", server.local_addr());

    let runner = ShutdownRunner::new(ShutdownConfig {
        graceful_timeout: Duration::from_secs(5),
    })
    .with_signals([InterruptSignal::User2]);

    let client = async {
        let body = reqwest::get(&url)
            .await
            .expect("Failed to send request")
            .text()
            .await
            .expect("Failed to read body");
        raise_later(Signal::SIGUSR2);
        body
    };

    let (clean, body) = tokio::join!(runner.run(&server), client);
    assert_eq!(body, "up");
    assert!(clean);
}
