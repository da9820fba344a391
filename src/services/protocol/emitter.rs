//! Event Emitter
//!
//! Optional channel sink for protocol events. Single-shot runs use a
//! disabled emitter so both modes share one pipeline code path.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use super::encoder::EventEncoder;
use super::events::ProtocolEvent;

pub struct EventEmitter {
    encoder: EventEncoder,
    event_tx: Option<mpsc::Sender<ProtocolEvent>>,
    closed: AtomicBool,
}

impl EventEmitter {
    pub fn new(encoder: EventEncoder, event_tx: Option<mpsc::Sender<ProtocolEvent>>) -> Self {
        Self {
            encoder,
            event_tx,
            closed: AtomicBool::new(false),
        }
    }

    /// Emitter that drops every event.
    pub fn disabled(encoder: EventEncoder) -> Self {
        Self::new(encoder, None)
    }

    pub fn encoder(&self) -> &EventEncoder {
        &self.encoder
    }

    pub fn is_streaming(&self) -> bool {
        self.event_tx.is_some()
    }

    /// Send one event. A gone receiver is logged once; the run carries on.
    pub async fn emit(&self, event: ProtocolEvent) {
        let Some(tx) = &self.event_tx else {
            return;
        };
        if self.closed.load(Ordering::Relaxed) {
            return;
        }
        if tx.send(event).await.is_err() {
            self.closed.store(true, Ordering::Relaxed);
            debug!("[Protocol] Event receiver dropped, discarding remaining events");
        }
    }

    pub async fn emit_all(&self, events: Vec<ProtocolEvent>) {
        for event in events {
            self.emit(event).await;
        }
    }

    pub async fn custom(&self, name: &str, value: Value) {
        self.emit(self.encoder.custom(name, value)).await;
    }
}
