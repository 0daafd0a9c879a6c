// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session lifecycle states.

use std::fmt;

/// Lifecycle of a synchronization session.
///
/// ```text
/// Idle → Connecting → Connected → Disconnected
///    ╲________________________________↗
/// ```
///
/// `Disconnected` is terminal. It carries the error that ended the session,
/// or `None` when the session was stopped on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Created, not started yet.
    #[default]
    Idle,
    /// Waiting for the transport to establish a session.
    Connecting,
    /// Receiving updates; commands can be published.
    Connected,
    /// Ended, either stopped or failed.
    Disconnected {
        /// Why the session ended, if it ended with an error.
        error: Option<String>,
    },
}

impl SessionState {
    /// Returns `true` while updates are being applied.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` once the session has ended.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }

    /// Returns the error that ended the session.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Disconnected { error } => error.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Disconnected { error: None } => f.write_str("disconnected"),
            Self::Disconnected { error: Some(e) } => write!(f, "disconnected ({e})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    #[test]
    fn terminal_states() {
        assert!(SessionState::Disconnected { error: None }.is_terminal());
        assert!(!SessionState::Connected.is_terminal());
        assert!(SessionState::Connected.is_connected());
    }

    #[test]
    fn error_only_on_disconnected() {
        let failed = SessionState::Disconnected {
            error: Some("refused".to_string()),
        };
        assert_eq!(failed.error(), Some("refused"));
        assert_eq!(SessionState::Connecting.error(), None);
    }

    #[test]
    fn display() {
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(
            SessionState::Disconnected {
                error: Some("timeout".to_string())
            }
            .to_string(),
            "disconnected (timeout)"
        );
    }
}
