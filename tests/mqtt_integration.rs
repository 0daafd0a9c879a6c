// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT transport using mockforge-mqtt.
//!
//! The mock broker accepts connections, subscriptions and publishes but does
//! not forward messages between clients, so these tests cover the session
//! lifecycle rather than telemetry delivery.

#![cfg(feature = "mqtt")]

use std::time::Duration;

use mockforge_mqtt::broker::MqttConfig as BrokerConfig;
use mockforge_mqtt::start_mqtt_server;
use tokio::time::sleep;
use yogurt_sync::protocol::{MqttConfig, MqttTransport, Transport, TransportHandle};
use yogurt_sync::{Error, ProtocolError, SessionState, SyncClient};

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = BrokerConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to bind
    sleep(Duration::from_millis(500)).await;
}

fn transport_for(port: u16) -> MqttTransport {
    let config = MqttConfig::builder()
        .broker(format!("mqtt://127.0.0.1:{port}"))
        .connection_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    MqttTransport::new(config)
}

// ============================================================================
// MqttTransport
// ============================================================================

mod transport {
    use super::*;

    #[tokio::test]
    async fn connect_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let result = transport_for(port).connect().await;
        assert!(result.is_ok(), "Failed to connect: {:?}", result.err());

        let handle = result.unwrap();
        assert!(handle.is_connected());
        handle.disconnect().await;
        assert!(!handle.is_connected());
    }

    #[tokio::test]
    async fn subscribe_and_publish() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let handle = transport_for(port).connect().await.unwrap();

        let subscription = handle.subscribe("yogurt/status").await.unwrap();
        assert_eq!(subscription.topic(), "yogurt/status");

        let result = handle.publish("yogurt/command", b"STOP".to_vec()).await;
        assert!(result.is_ok());

        handle.disconnect().await;
    }

    #[tokio::test]
    async fn disconnect_ends_subscriptions() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let handle = transport_for(port).connect().await.unwrap();
        let mut subscription = handle.subscribe("yogurt/temperature").await.unwrap();

        handle.disconnect().await;
        handle.disconnect().await;

        let next = tokio::time::timeout(Duration::from_secs(2), subscription.next())
            .await
            .unwrap();
        assert!(next.is_none());
        assert!(handle.publish("yogurt/command", Vec::new()).await.is_err());
    }

    #[tokio::test]
    async fn connect_without_broker_fails() {
        // Nothing listens on this port
        let port = get_test_port();

        let result = transport_for(port).connect().await;
        match result {
            Err(ProtocolError::ConnectionFailed(reason)) => {
                assert!(
                    reason.to_lowercase().contains("refused"),
                    "cause not reported: {reason}"
                );
            }
            other => panic!("expected connection failure, got {:?}", other.err()),
        }
    }
}

// ============================================================================
// SyncClient over MQTT
// ============================================================================

mod sync_client {
    use super::*;

    #[tokio::test]
    async fn start_send_commands_and_stop() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let client = SyncClient::new(transport_for(port));
        client.start().await.unwrap();
        assert_eq!(client.session_state(), SessionState::Connected);

        client.start_process(42.0, 8).await.unwrap();
        client.stop_process().await.unwrap();

        client.stop().await;
        assert_eq!(
            client.session_state(),
            SessionState::Disconnected { error: None }
        );
        assert!(matches!(
            client.stop_process().await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn start_without_broker_reports_connect_error() {
        let port = get_test_port();
        let client = SyncClient::new(transport_for(port));
        let mut snapshots = client.subscribe();

        let result = client.start().await;

        assert!(matches!(result, Err(Error::Connect(_))));
        let session = client.session_state();
        assert!(session.error().unwrap().to_lowercase().contains("refused"));
        assert!(snapshots.recv().await.is_err());
    }
}
