use tokio::sync::mpsc::UnboundedSender;

use super::events::AppEvent;

/// Receiver of state changes published by the core
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AppEvent);
}

/// Forwards events to the front-end's render loop
pub struct ChannelSink {
    tx: UnboundedSender<AppEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: AppEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            tracing::debug!(event = name, "Render loop gone; dropping event");
        }
    }
}

#[cfg(test)]
use std::sync::Mutex;

/// Keeps every event in memory, in emission order
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AppEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn events(&self) -> Vec<AppEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn emit(&self, event: AppEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
