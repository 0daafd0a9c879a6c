// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Partial state updates decoded from inbound messages.

use serde::{Deserialize, Serialize};

use crate::types::StatusCode;

/// A partial update derived from one inbound message.
///
/// Every variant except [`StateDelta::Unrecognized`] replaces exactly one
/// field of a [`DeviceState`](super::DeviceState).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StateDelta {
    /// New temperature reading in degrees Celsius.
    TemperatureUpdate(f32),

    /// New device status.
    StatusUpdate(StatusCode),

    /// The message did not come from a known topic.
    Unrecognized,
}

impl StateDelta {
    /// Returns `true` if applying this delta can change a snapshot.
    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_is_not_recognized() {
        assert!(!StateDelta::Unrecognized.is_recognized());
        assert!(StateDelta::TemperatureUpdate(0.0).is_recognized());
        assert!(StateDelta::StatusUpdate(StatusCode::Error).is_recognized());
    }
}
