//! Background tasks for long backend operations.
//!
//! Each task runs on its own named thread. The caller owns the handle and
//! decides when to collect the result; a cancelled task never hands its
//! result back, even if the work itself completed.

use std::any::Any;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use xlive_core::{PresenceRecord, Result, SessionId};

use crate::client::BackendClient;

/// How a task ended.
#[derive(Debug, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    /// Ran to completion and was not cancelled.
    Completed(T),
    /// Cancelled; any result was discarded.
    Cancelled,
    /// The task panicked with this message.
    Panicked(String),
}

/// Handle to work running on a background thread.
#[derive(Debug)]
pub struct BackgroundTask<T> {
    name: String,
    cancel: CancellationToken,
    handle: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    /// Run `work` on a new thread named `name`. `work` should poll the token
    /// between steps.
    pub fn spawn<F>(name: &str, work: F) -> io::Result<Self>
    where
        F: FnOnce(&CancellationToken) -> T + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || work(&token))?;
        debug!(task = name, "background task started");
        Ok(Self {
            name: name.to_string(),
            cancel,
            handle: Some(handle),
        })
    }

    /// Thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token the work polls. Cancelling a clone cancels this task.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation. The thread is not interrupted.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the thread and collect its outcome.
    pub fn join(mut self) -> TaskOutcome<T> {
        let Some(handle) = self.handle.take() else {
            return TaskOutcome::Cancelled;
        };
        match handle.join() {
            Ok(_) if self.cancel.is_cancelled() => {
                debug!(task = %self.name, "task cancelled, result discarded");
                TaskOutcome::Cancelled
            }
            Ok(value) => TaskOutcome::Completed(value),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(task = %self.name, %message, "background task panicked");
                TaskOutcome::Panicked(message)
            }
        }
    }
}

impl<T> Drop for BackgroundTask<T> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel.cancel();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl BackendClient {
    /// Refresh friends presence for `user_index` off the calling thread.
    pub fn spawn_presence_refresh(
        self: &Arc<Self>,
        user_index: u32,
    ) -> io::Result<BackgroundTask<Vec<PresenceRecord>>> {
        let client = Arc::clone(self);
        BackgroundTask::spawn(&format!("presence-refresh-{user_index}"), move |cancel| {
            if cancel.is_cancelled() {
                return Vec::new();
            }
            client.get_all_friends_presence(user_index)
        })
    }

    /// Publish a QoS payload off the calling thread.
    pub fn spawn_qos_publish(
        self: &Arc<Self>,
        session: SessionId,
        payload: Vec<u8>,
    ) -> io::Result<BackgroundTask<Result<bool>>> {
        let client = Arc::clone(self);
        BackgroundTask::spawn(&format!("qos-publish-{session}"), move |cancel| {
            if cancel.is_cancelled() {
                return Ok(false);
            }
            client.publish_qos(session, &payload).inspect_err(|e| {
                warn!(%session, error = %e, "qos publish failed");
            })
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
