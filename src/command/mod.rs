// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Commands sent to the yogurt maker.
//!
//! Commands are published on the [`COMMAND`](crate::topic::COMMAND) topic as
//! plain UTF-8 text. They are one-directional: the device answers through the
//! status topic, never by echoing the command.
//!
//! | Command | Payload |
//! |---------|---------|
//! | [`Command::Start`] | `START,<target °C>,<hours>` |
//! | [`Command::Stop`] | `STOP` |
//!
//! # Examples
//!
//! ```
//! use yogurt_sync::command::Command;
//!
//! let start = Command::start(45.0, 10);
//! assert_eq!(start.payload(), "START,45.0,10");
//!
//! assert_eq!(Command::Stop.payload(), "STOP");
//! ```

use std::fmt;

use crate::topic;
use crate::types::format_temperature;

/// A command for the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Start fermenting.
    Start {
        /// Setpoint in degrees Celsius.
        target_temperature: f32,
        /// Fermentation duration in hours.
        fermentation_hours: u32,
    },
    /// Stop the running program.
    Stop,
}

impl Command {
    /// Creates a start command.
    #[must_use]
    pub const fn start(target_temperature: f32, fermentation_hours: u32) -> Self {
        Self::Start {
            target_temperature,
            fermentation_hours,
        }
    }

    /// Returns the command name as it appears on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "START",
            Self::Stop => "STOP",
        }
    }

    /// Returns the topic the command is published on.
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        topic::COMMAND
    }

    /// Encodes the command payload.
    #[must_use]
    pub fn payload(&self) -> String {
        match *self {
            Self::Start {
                target_temperature,
                fermentation_hours,
            } => format!(
                "{},{},{fermentation_hours}",
                self.name(),
                format_temperature(target_temperature)
            ),
            Self::Stop => self.name().to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload())
    }
}
