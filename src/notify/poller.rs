// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! # Notification Poller
//!
//! Background task that periodically re-fetches backend notifications and
//! surfaces unseen ones as user notices. Replaces an always-on interval
//! with a cancellable task whose lifetime is tied to the consuming view.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`; spawn with
//! `tokio::spawn(poller.run(shutdown.clone()))` and cancel the token when
//! the view goes away.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::BackendApi;
use crate::notify::{NoticeLevel, Notices};

/// Default interval between polling sweeps.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Background poller for backend notifications.
pub struct NotificationPoller {
    api: BackendApi,
    notices: Notices,
    poll_interval: Duration,
    seen: Mutex<HashSet<i64>>,
}

impl NotificationPoller {
    pub fn new(api: BackendApi, notices: Notices) -> Self {
        Self {
            api,
            notices,
            poll_interval: DEFAULT_POLL_INTERVAL,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Override the sweep interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run the poller loop until the cancellation token is triggered.
    pub async fn run(self, shutdown: CancellationToken) {
        debug!(
            interval_secs = self.poll_interval.as_secs(),
            "Notification poller starting"
        );

        loop {
            if shutdown.is_cancelled() {
                debug!("Notification poller shutting down");
                return;
            }

            self.poll_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    debug!("Notification poller shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep: fetch notifications and surface unseen ones.
    async fn poll_step(&self) {
        let notifications = match self.api.notifications().await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "Notification poll failed");
                return;
            }
        };

        let mut seen = self.seen.lock().unwrap();
        for notification in notifications {
            if seen.insert(notification.id) && !notification.read {
                self.notices.notify(NoticeLevel::Info, &notification.message);
            }
        }
    }
}
