// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `yogurt_sync` library.
//!
//! Transport failures are described by [`ProtocolError`]. The synchronization
//! client wraps them in [`Error`] according to the phase in which they happened
//! (connect, subscribe or publish), so callers can tell a session that never
//! started from a command that could not be sent.
//!
//! Malformed payloads are not errors at this level: the decoder resolves them
//! to fail-safe values. [`ValueError`] only surfaces when a caller parses wire
//! values explicitly, for example through `StatusCode::from_str`.

use thiserror::Error;

use crate::client::SessionState;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not establish a session.
    ///
    /// The session is terminal afterwards; the client never retries.
    #[error("connect failed: {0}")]
    Connect(#[source] ProtocolError),

    /// A subscription failed after the connection was established.
    #[error("subscribe failed: {0}")]
    Subscribe(#[source] ProtocolError),

    /// A command could not be published.
    ///
    /// Commands are not retried because the device gives no confirmation
    /// that a previous attempt was lost.
    #[error("publish failed: {0}")]
    Publish(#[source] ProtocolError),

    /// The session is not connected.
    #[error("session is not connected")]
    NotConnected,

    /// The operation is not allowed in the current session state.
    #[error("operation not allowed while session is {0}")]
    InvalidState(SessionState),

    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),
}

/// Errors related to wire value validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The status name is not one of the known status codes.
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// The temperature payload is not a finite decimal number.
    #[error("invalid temperature: {0}")]
    InvalidTemperature(String),
}

/// Errors reported by a transport implementation.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT client request failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A subscription stream failed after it was established.
    #[error("subscription to {topic} failed: {message}")]
    SubscribeFailed {
        /// The topic of the failed subscription.
        topic: String,
        /// Description of the failure.
        message: String,
    },

    /// Operation timed out.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::InvalidStatus("running".to_string());
        assert_eq!(err.to_string(), "invalid status: running");
    }

    #[test]
    fn error_from_value_error() {
        let err: Error = ValueError::InvalidTemperature("abc".to_string()).into();
        assert!(matches!(err, Error::Value(ValueError::InvalidTemperature(_))));
    }

    #[test]
    fn connect_error_display() {
        let err = Error::Connect(ProtocolError::ConnectionFailed("refused".to_string()));
        assert_eq!(err.to_string(), "connect failed: connection failed: refused");
    }

    #[test]
    fn subscribe_failed_display() {
        let err = ProtocolError::SubscribeFailed {
            topic: "yogurt/status".to_string(),
            message: "broker went away".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "subscription to yogurt/status failed: broker went away"
        );
    }

    #[test]
    fn invalid_state_display() {
        let err = Error::InvalidState(SessionState::Connected);
        assert_eq!(
            err.to_string(),
            "operation not allowed while session is connected"
        );
    }
}
