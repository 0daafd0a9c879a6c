// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types exchanged with the yogurt maker.
//!
//! # Types
//!
//! - [`StatusCode`] - Closed set of device status codes
//! - [`parse_temperature`] / [`format_temperature`] - Decimal wire format for
//!   temperatures

mod status;
mod temperature;

pub use status::StatusCode;
pub use temperature::{format_temperature, parse_temperature};
