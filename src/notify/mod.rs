// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! User-facing notices and the background notification poller.
//!
//! Every failure in the integration layer produces exactly one notice:
//! never silent, never duplicated. Global events that many concurrent
//! requests can observe at once (session expiry) go through the keyed
//! single-fire path.

pub mod poller;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub use poller::NotificationPoller;

/// Notice key for the once-per-expiry "session expired" message.
pub const NOTICE_SESSION_EXPIRED: &str = "session_expired";

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Sink for user-facing notices. The host application decides how notices
/// are rendered (toasts, status bar, CLI output).
pub trait UserNotifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Default sink: routes notices to the tracing subscriber.
pub struct TracingNotifier;

impl UserNotifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!(notice = message),
            NoticeLevel::Warning => tracing::warn!(notice = message),
            NoticeLevel::Error => tracing::error!(notice = message),
        }
    }
}

/// Buffering sink that records notices for later retrieval. Useful for
/// hosts that render notices on their own cadence, and for tests.
#[derive(Default)]
pub struct BufferNotifier {
    entries: Mutex<Vec<(NoticeLevel, String)>>,
}

impl BufferNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices recorded so far.
    pub fn messages(&self) -> Vec<(NoticeLevel, String)> {
        self.entries.lock().unwrap().clone()
    }

    /// Remove and return all recorded notices.
    pub fn drain(&self) -> Vec<(NoticeLevel, String)> {
        std::mem::take(&mut *self.entries.lock().unwrap())
    }
}

impl UserNotifier for BufferNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.entries.lock().unwrap().push((level, message.to_string()));
    }
}

struct NoticesInner {
    sink: Arc<dyn UserNotifier>,
    fired: Mutex<HashSet<String>>,
}

/// Notice dispatcher with a keyed single-fire guard.
#[derive(Clone)]
pub struct Notices {
    inner: Arc<NoticesInner>,
}

impl Notices {
    pub fn new(sink: Arc<dyn UserNotifier>) -> Self {
        Self {
            inner: Arc::new(NoticesInner {
                sink,
                fired: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Dispatcher that logs through tracing.
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingNotifier))
    }

    /// Emit a notice unconditionally.
    pub fn notify(&self, level: NoticeLevel, message: &str) {
        self.inner.sink.notify(level, message);
    }

    /// Emit a notice at most once per key until the key is reset.
    /// Returns `true` when the notice was actually emitted.
    pub fn notify_once(&self, key: &str, level: NoticeLevel, message: &str) -> bool {
        let mut fired = self.inner.fired.lock().unwrap();
        if !fired.insert(key.to_string()) {
            return false;
        }
        drop(fired);
        self.inner.sink.notify(level, message);
        true
    }

    /// Re-arm a single-fire key (e.g. after a fresh login).
    pub fn reset(&self, key: &str) {
        self.inner.fired.lock().unwrap().remove(key);
    }
}
