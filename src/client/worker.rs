// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background task that drives a session's subscriptions.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::ProtocolError;
use crate::protocol::{RawMessage, Subscription, TransportHandle};

use super::shared::Shared;

/// Handle to a running session task.
#[derive(Debug)]
pub(crate) struct Worker {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Worker {
    /// Spawns the task that merges both subscriptions into the snapshot.
    pub(crate) fn spawn<H: TransportHandle>(
        shared: Arc<Shared<H>>,
        temperature: Subscription,
        status: Subscription,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(shared, temperature, status, shutdown_rx));
        Self { shutdown_tx, task }
    }

    /// Signals the task and waits for it to finish.
    pub(crate) async fn shutdown(self) {
        // The task may already have ended on a transport failure
        let _ = self.shutdown_tx.send(());

        if let Err(e) = self.task.await
            && e.is_panic()
        {
            tracing::error!(error = %e, "Session task panicked");
        }
    }
}

/// Which subscription an item came from.
#[derive(Debug, Clone, Copy)]
enum Source {
    Temperature,
    Status,
}

/// Main processing loop.
///
/// Runs until shutdown is signalled (or the client is dropped), a
/// subscription fails, or both subscriptions end. Every exit path closes the
/// session and releases the transport handle.
async fn run<H: TransportHandle>(
    shared: Arc<Shared<H>>,
    mut temperature: Subscription,
    mut status: Subscription,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    tracing::debug!(session = %shared.session_id, "Session task started");

    let mut temperature_open = true;
    let mut status_open = true;

    let error = loop {
        let (source, item) = tokio::select! {
            biased;

            _ = &mut shutdown_rx => {
                tracing::debug!(session = %shared.session_id, "Shutdown signal received");
                break None;
            }
            item = temperature.next(), if temperature_open => (Source::Temperature, item),
            item = status.next(), if status_open => (Source::Status, item),
        };

        match item {
            Some(Ok(message)) => on_message(&shared, &message),
            Some(Err(e)) => break Some(subscription_failed(&shared, &e)),
            None => {
                match source {
                    Source::Temperature => temperature_open = false,
                    Source::Status => status_open = false,
                }
                tracing::debug!(session = %shared.session_id, ?source, "Subscription ended");

                if !temperature_open && !status_open {
                    break Some("transport closed all subscriptions".to_string());
                }
            }
        }
    };

    shared.close(error);
    shared.release().await;
    tracing::debug!(session = %shared.session_id, "Session task finished");
}

fn on_message<H: TransportHandle>(shared: &Shared<H>, message: &RawMessage) {
    if shared.apply(message).is_none() {
        tracing::trace!(
            session = %shared.session_id,
            topic = %message.topic(),
            "Message produced no snapshot"
        );
    }
}

fn subscription_failed<H: TransportHandle>(shared: &Shared<H>, error: &ProtocolError) -> String {
    tracing::error!(session = %shared.session_id, error = %error, "Subscription failed");
    error.to_string()
}
