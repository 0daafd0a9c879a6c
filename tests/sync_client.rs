// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests of [`SyncClient`] over the loopback transport.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use yogurt_sync::protocol::MemoryTransport;
use yogurt_sync::{DeviceState, SessionState, StatusCode, SyncClient, topic};

async fn connected() -> (MemoryTransport, SyncClient<MemoryTransport>) {
    let transport = MemoryTransport::new();
    let client = SyncClient::new(transport.clone());
    client.start().await.unwrap();
    (transport, client)
}

#[tokio::test]
async fn fermentation_session() {
    let (transport, client) = connected().await;
    let mut snapshots = client.subscribe();

    let initial = client.state();
    assert_eq!(initial.current_temperature(), 0.0);
    assert_eq!(initial.target_temperature(), 42.0);
    assert_eq!(initial.fermentation_time(), 8);
    assert!(!initial.is_running());
    assert_eq!(initial.status(), StatusCode::Idle);

    transport.inject(topic::TEMPERATURE, "38.5").await;
    let after_temperature = snapshots.recv().await.unwrap();
    assert_eq!(after_temperature, initial.with_current_temperature(38.5));

    transport.inject(topic::STATUS, "RUNNING").await;
    let after_status = snapshots.recv().await.unwrap();
    assert_eq!(after_status, after_temperature.with_status(StatusCode::Running));

    client.start_process(42.0, 8).await.unwrap();
    let published = transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic(), "yogurt/command");
    assert_eq!(published[0].payload(), b"START,42.0,8");
    assert_eq!(client.state(), after_status);

    client.stop().await;
    assert!(matches!(snapshots.recv().await, Err(RecvError::Closed)));
    assert_eq!(client.state(), after_status);
}

#[tokio::test]
async fn malformed_telemetry_falls_back() {
    let (transport, client) = connected().await;
    let mut snapshots = client.subscribe();

    transport.inject(topic::TEMPERATURE, "40.0").await;
    transport.inject(topic::TEMPERATURE, "warm").await;
    transport.inject(topic::STATUS, "running").await;

    assert_eq!(snapshots.recv().await.unwrap().current_temperature(), 40.0);
    assert_eq!(snapshots.recv().await.unwrap().current_temperature(), 0.0);
    assert_eq!(snapshots.recv().await.unwrap().status(), StatusCode::Error);
}

#[tokio::test]
async fn fault_statuses_are_reported() {
    let (transport, client) = connected().await;
    let mut snapshots = client.subscribe();

    transport.inject(topic::STATUS, "TEMPERATURE_TOO_HIGH").await;
    transport.inject(topic::STATUS, "TEMPERATURE_TOO_LOW").await;

    let high = snapshots.recv().await.unwrap().status();
    let low = snapshots.recv().await.unwrap().status();
    assert_eq!(high, StatusCode::TemperatureTooHigh);
    assert_eq!(low, StatusCode::TemperatureTooLow);
    assert!(high.is_fault() && low.is_fault());
}

#[tokio::test]
async fn consumers_on_other_tasks_see_the_same_sequence() {
    let (transport, client) = connected().await;
    let client = Arc::new(client);

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let mut rx = client.subscribe();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..4 {
                    seen.push(rx.recv().await.unwrap().current_temperature());
                }
                seen
            })
        })
        .collect();

    for reading in ["20.0", "25.5", "30.0", "35.5"] {
        transport.inject(topic::TEMPERATURE, reading).await;
    }

    for consumer in consumers {
        assert_eq!(consumer.await.unwrap(), vec![20.0, 25.5, 30.0, 35.5]);
    }
    client.stop().await;
}

#[tokio::test]
async fn stop_ends_every_consumer_stream() {
    let (transport, client) = connected().await;
    let mut snapshots = client.subscribe();
    let mut latest = client.watch_state();

    transport.inject(topic::TEMPERATURE, "41.0").await;
    latest
        .wait_for(|state| state.current_temperature() == 41.0)
        .await
        .unwrap();

    let watcher = tokio::spawn(async move {
        while latest.changed().await.is_ok() {}
        latest.borrow().current_temperature()
    });
    client.stop().await;

    assert!(matches!(snapshots.recv().await, Err(RecvError::Closed)));
    assert_eq!(watcher.await.unwrap(), 41.0);
}

#[tokio::test]
async fn late_subscriber_starts_from_next_snapshot() {
    let (transport, client) = connected().await;
    let mut early = client.subscribe();

    transport.inject(topic::STATUS, "RUNNING").await;
    early.recv().await.unwrap();

    let mut late = client.subscribe();
    transport.inject(topic::STATUS, "COMPLETED").await;

    assert_eq!(late.recv().await.unwrap().status(), StatusCode::Completed);
    assert_eq!(early.recv().await.unwrap().status(), StatusCode::Completed);
    assert_eq!(
        client.state(),
        DeviceState::new().with_status(StatusCode::Completed)
    );
}

#[tokio::test]
async fn unrelated_topics_are_ignored() {
    let (transport, client) = connected().await;
    let mut session = client.watch_session();

    assert_eq!(transport.inject("yogurt/other", "RUNNING").await, 0);
    assert_eq!(client.state(), DeviceState::default());
    assert!(!session.has_changed().unwrap());
    assert_eq!(*session.borrow_and_update(), SessionState::Connected);
}
