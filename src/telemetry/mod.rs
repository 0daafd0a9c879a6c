// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding of inbound device messages.
//!
//! The device reports its state on two topics:
//!
//! - `yogurt/temperature` - Decimal temperature reading (`"41.8"`)
//! - `yogurt/status` - Status name (`"RUNNING"`)
//!
//! Decoding never fails. A payload that cannot be read resolves to a
//! fail-safe value so a single bad message cannot halt synchronization:
//! temperature becomes `0.0` and status becomes [`StatusCode::Error`].
//! Messages on any other topic decode to [`StateDelta::Unrecognized`].
//!
//! # Examples
//!
//! ```
//! use yogurt_sync::state::StateDelta;
//! use yogurt_sync::telemetry::decode;
//! use yogurt_sync::types::StatusCode;
//!
//! assert_eq!(
//!     decode("yogurt/temperature", b"38.5"),
//!     StateDelta::TemperatureUpdate(38.5)
//! );
//! assert_eq!(
//!     decode("yogurt/status", b"overheated"),
//!     StateDelta::StatusUpdate(StatusCode::Error)
//! );
//! assert_eq!(decode("yogurt/other", b"1"), StateDelta::Unrecognized);
//! ```

use crate::state::StateDelta;
use crate::topic;
use crate::types::{StatusCode, parse_temperature};

/// Temperature reported when a reading cannot be decoded.
pub const FALLBACK_TEMPERATURE: f32 = 0.0;

/// Decodes a message into a state delta.
#[must_use]
pub fn decode(topic: &str, payload: &[u8]) -> StateDelta {
    match topic {
        topic::TEMPERATURE => decode_temperature(payload),
        topic::STATUS => decode_status(payload),
        _ => {
            tracing::trace!(topic = %topic, "Ignoring message on unknown topic");
            StateDelta::Unrecognized
        }
    }
}

/// Decodes a temperature payload.
///
/// Falls back to [`FALLBACK_TEMPERATURE`] when the payload is not valid UTF-8
/// or not a finite decimal number.
#[must_use]
pub fn decode_temperature(payload: &[u8]) -> StateDelta {
    let parsed = std::str::from_utf8(payload)
        .map_err(|e| e.to_string())
        .and_then(|text| parse_temperature(text).map_err(|e| e.to_string()));

    match parsed {
        Ok(celsius) => StateDelta::TemperatureUpdate(celsius),
        Err(reason) => {
            tracing::warn!(
                payload = %String::from_utf8_lossy(payload),
                reason = %reason,
                "Unreadable temperature, using fallback"
            );
            StateDelta::TemperatureUpdate(FALLBACK_TEMPERATURE)
        }
    }
}

/// Decodes a status payload.
///
/// The payload must be one of the status names exactly; anything else decodes
/// to [`StatusCode::Error`].
#[must_use]
pub fn decode_status(payload: &[u8]) -> StateDelta {
    let status = std::str::from_utf8(payload)
        .ok()
        .and_then(|text| text.parse::<StatusCode>().ok());

    StateDelta::StatusUpdate(status.unwrap_or_else(|| {
        tracing::warn!(
            payload = %String::from_utf8_lossy(payload),
            "Unknown status, reporting ERROR"
        );
        StatusCode::Error
    }))
}
