//! Notification dispatchers.

use std::sync::Mutex;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

use accrue_core::events::{LifecycleEvent, NotificationDispatcher};

/// Pushes events onto an unbounded channel drained by a background task.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: UnboundedSender<LifecycleEvent>,
}

impl ChannelDispatcher {
    /// Creates the dispatcher and the receiving end for the consumer task.
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<LifecycleEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationDispatcher for ChannelDispatcher {
    fn dispatch(&self, event: LifecycleEvent) {
        if let Err(err) = self.sender.send(event) {
            warn!(
                event = err.0.kind(),
                request_id = %err.0.request_id(),
                "notification consumer has stopped, event dropped"
            );
        }
    }
}

/// Keeps every event in memory. Used by tests and local runs.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingDispatcher {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Names of the recorded events, oldest first.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(LifecycleEvent::kind).collect()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn dispatch(&self, event: LifecycleEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
