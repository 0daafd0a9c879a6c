// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state snapshot.

use serde::{Deserialize, Serialize};

use crate::types::StatusCode;

use super::StateDelta;

/// Default fermentation setpoint in degrees Celsius.
pub const DEFAULT_TARGET_TEMPERATURE: f32 = 42.0;

/// Default fermentation duration in hours.
pub const DEFAULT_FERMENTATION_HOURS: u32 = 8;

/// Snapshot of the yogurt maker's observable state.
///
/// Snapshots are values: nothing mutates a snapshot in place. The `with_*`
/// methods and [`apply`](Self::apply) return a new snapshot with a single
/// field replaced.
///
/// # Examples
///
/// ```
/// use yogurt_sync::state::DeviceState;
/// use yogurt_sync::types::StatusCode;
///
/// let state = DeviceState::new();
/// assert_eq!(state.current_temperature(), 0.0);
/// assert_eq!(state.target_temperature(), 42.0);
/// assert_eq!(state.fermentation_time(), 8);
/// assert!(!state.is_running());
/// assert_eq!(state.status(), StatusCode::Idle);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    /// Last observed temperature in degrees Celsius.
    current_temperature: f32,
    /// Fermentation setpoint in degrees Celsius.
    target_temperature: f32,
    /// Configured fermentation duration in hours.
    fermentation_time: u32,
    /// Whether the device is actively fermenting.
    is_running: bool,
    /// Last reported status.
    status: StatusCode,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            current_temperature: 0.0,
            target_temperature: DEFAULT_TARGET_TEMPERATURE,
            fermentation_time: DEFAULT_FERMENTATION_HOURS,
            is_running: false,
            status: StatusCode::Idle,
        }
    }
}

impl DeviceState {
    /// Creates the snapshot a session starts with.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the last observed temperature.
    #[must_use]
    pub fn current_temperature(&self) -> f32 {
        self.current_temperature
    }

    /// Gets the fermentation setpoint.
    #[must_use]
    pub fn target_temperature(&self) -> f32 {
        self.target_temperature
    }

    /// Gets the fermentation duration in hours.
    #[must_use]
    pub fn fermentation_time(&self) -> u32 {
        self.fermentation_time
    }

    /// Returns `true` if the device is fermenting.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Gets the last reported status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns a copy with a new current temperature.
    #[must_use]
    pub fn with_current_temperature(self, celsius: f32) -> Self {
        Self {
            current_temperature: celsius,
            ..self
        }
    }

    /// Returns a copy with a new fermentation setpoint.
    #[must_use]
    pub fn with_target_temperature(self, celsius: f32) -> Self {
        Self {
            target_temperature: celsius,
            ..self
        }
    }

    /// Returns a copy with a new fermentation duration.
    #[must_use]
    pub fn with_fermentation_time(self, hours: u32) -> Self {
        Self {
            fermentation_time: hours,
            ..self
        }
    }

    /// Returns a copy with a new running flag.
    #[must_use]
    pub fn with_running(self, running: bool) -> Self {
        Self {
            is_running: running,
            ..self
        }
    }

    /// Returns a copy with a new status.
    #[must_use]
    pub fn with_status(self, status: StatusCode) -> Self {
        Self { status, ..self }
    }

    /// Derives the next snapshot from a delta.
    ///
    /// Only the field named by the delta changes. [`StateDelta::Unrecognized`]
    /// yields an identical snapshot.
    #[must_use]
    pub fn apply(&self, delta: &StateDelta) -> Self {
        match *delta {
            StateDelta::TemperatureUpdate(celsius) => self.with_current_temperature(celsius),
            StateDelta::StatusUpdate(status) => self.with_status(status),
            StateDelta::Unrecognized => *self,
        }
    }
}
