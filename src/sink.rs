//! Consumers of decoded telemetry.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::DecodeError;
use crate::session::SessionState;
use crate::telemetry_frame::TelemetryFrame;

/// Receives everything a [`crate::Session`] produces.
///
/// `on_frame` and `on_decode_error` are called from the transport's notification
/// context, so implementations must not block.
pub trait TelemetrySink: Send + Sync {
    fn on_frame(&self, frame: TelemetryFrame);
    fn on_decode_error(&self, error: DecodeError);
    fn on_session_state_change(&self, state: SessionState);
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Frame(TelemetryFrame),
    DecodeError(DecodeError),
    StateChange(SessionState),
}

/// A frame together with the time it was received
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub received_at: DateTime<Utc>,
    pub frame: TelemetryFrame,
}

/// Forwards events into a bounded channel and remembers the latest frame.
///
/// When the consumer falls behind, events are dropped rather than blocking the
/// notification context.
pub struct ChannelSink {
    tx: mpsc::Sender<SessionEvent>,
    latest: Mutex<Option<Reading>>,
}

impl ChannelSink {
    pub const DEFAULT_CAPACITY: usize = 50;

    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, latest: Mutex::new(None) }, rx)
    }

    /// The most recent frame, if any has been decoded yet
    pub fn latest(&self) -> Option<Reading> {
        self.latest.lock().ok().and_then(|latest| latest.clone())
    }

    fn send(&self, event: SessionEvent) {
        if let Err(mpsc::error::TrySendError::Full(event)) = self.tx.try_send(event) {
            warn!(?event, "status buffer full, dropping");
        }
    }
}

impl TelemetrySink for ChannelSink {
    fn on_frame(&self, frame: TelemetryFrame) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(Reading {
                received_at: Utc::now(),
                frame: frame.clone(),
            });
        }
        self.send(SessionEvent::Frame(frame));
    }

    fn on_decode_error(&self, error: DecodeError) {
        self.send(SessionEvent::DecodeError(error));
    }

    fn on_session_state_change(&self, state: SessionState) {
        self.send(SessionEvent::StateChange(state));
    }
}
