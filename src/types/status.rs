// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device status codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Status reported by the device on the status topic.
///
/// Wire names are matched case-sensitively. The decoder maps anything it does
/// not recognize to [`StatusCode::Error`].
///
/// # Examples
///
/// ```
/// use yogurt_sync::types::StatusCode;
///
/// assert_eq!(StatusCode::TemperatureTooHigh.as_str(), "TEMPERATURE_TOO_HIGH");
/// assert_eq!("RUNNING".parse::<StatusCode>().unwrap(), StatusCode::Running);
/// assert!("running".parse::<StatusCode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// Waiting for a start command.
    #[default]
    Idle,
    /// Fermentation in progress.
    Running,
    /// Fermentation finished.
    Completed,
    /// Temperature is above the acceptable range.
    TemperatureTooHigh,
    /// Temperature is below the acceptable range.
    TemperatureTooLow,
    /// Device fault, or a status the client could not read.
    Error,
}

impl StatusCode {
    /// All status codes, in wire declaration order.
    pub const ALL: [Self; 6] = [
        Self::Idle,
        Self::Running,
        Self::Completed,
        Self::TemperatureTooHigh,
        Self::TemperatureTooLow,
        Self::Error,
    ];

    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::TemperatureTooHigh => "TEMPERATURE_TOO_HIGH",
            Self::TemperatureTooLow => "TEMPERATURE_TOO_LOW",
            Self::Error => "ERROR",
        }
    }

    /// Returns `true` for statuses that signal a problem with the batch.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(
            self,
            Self::TemperatureTooHigh | Self::TemperatureTooLow | Self::Error
        )
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusCode {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValueError::InvalidStatus(s.to_string()))
    }
}
