// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic names shared with the device firmware.
//!
//! These must match the firmware byte for byte.

/// Inbound temperature readings, payload is a decimal string such as `"41.8"`.
pub const TEMPERATURE: &str = "yogurt/temperature";

/// Inbound status reports, payload is a status name such as `"RUNNING"`.
pub const STATUS: &str = "yogurt/status";

/// Outbound commands, payload is `"START,<float>,<int>"` or `"STOP"`.
pub const COMMAND: &str = "yogurt/command";

/// Topics the synchronization client subscribes to.
pub const INBOUND: [&str; 2] = [TEMPERATURE, STATUS];
