//! Drives one device from discovery through the keep-alive cadence.
//!
//! The device only streams while it keeps receiving a heartbeat followed by a data
//! request roughly every 1.5s. It answers a data request with a notification, but
//! the two are not paired: notifications are decoded as they arrive, on the
//! transport's context, while the cadence runs on the task calling [`Session::run`].

use std::future::Future;
use std::sync::Arc;

use bluest::Uuid;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, trace, warn};

use crate::device_profile::DeviceProfile;
use crate::error::{DecodeError, SessionError, TransportError};
use crate::message::data_message::decode;
use crate::sink::TelemetrySink;
use crate::transport::{NotificationHandler, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Scanning,
    Connecting,
    /// Connected, subscribed and waiting out the settle delay after authenticating
    Authenticating,
    /// Running the heartbeat / data request cadence
    Active,
    Terminated,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Scanning, Connecting)
                | (Connecting, Authenticating)
                | (Authenticating, Active)
                | (Scanning | Connecting | Authenticating | Active, Terminated)
        )
    }
}

/// Asks a running [`Session`] to stop. Dropping the handle does not stop it.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<watch::Sender<bool>>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.send_replace(true);
    }
}

pub struct Session<T: Transport> {
    transport: T,
    profile: DeviceProfile,
    sink: Arc<dyn TelemetrySink>,
    state: SessionState,
    stop: watch::Receiver<bool>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, profile: DeviceProfile, sink: Arc<dyn TelemetrySink>) -> (Self, StopHandle) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let session = Self {
            transport,
            profile,
            sink,
            state: SessionState::Scanning,
            stop: stop_rx,
        };
        (session, StopHandle(Arc::new(stop_tx)))
    }

    /// Run the session until it is stopped or the link fails.
    ///
    /// Returns `Ok(())` only when stopped through the [`StopHandle`]. The sink always
    /// sees the final [`SessionState::Terminated`].
    pub async fn run(mut self) -> Result<(), SessionError> {
        self.sink.on_session_state_change(self.state);

        let result = self.drive().await;
        match &result {
            Ok(()) => info!("session stopped"),
            Err(err) => error!(%err, "session terminated"),
        }

        self.transition(SessionState::Terminated);
        result
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        let timings = self.profile.timings;

        info!(address = %self.profile.address, "scanning");
        let discovery = self
            .transport
            .discover_by_address(&self.profile.address, timings.discovery_timeout);
        let device = match unless_stopped(&mut self.stop, discovery).await {
            None => return Ok(()),
            Some(None) => return Err(SessionError::DiscoveryTimeout),
            Some(Some(device)) => device,
        };

        self.transition(SessionState::Connecting);
        // Connecting is not abandoned midway, or the link could come up with nobody to close it
        let connection = self
            .transport
            .connect(device)
            .await
            .map_err(SessionError::ConnectionFailed)?;

        let result = if *self.stop.borrow() {
            Ok(())
        } else {
            self.drive_connected(&connection).await
        };

        if let Err(err) = self.transport.disconnect(&connection).await {
            warn!(%err, "failed to disconnect");
        }

        result
    }

    async fn drive_connected(&mut self, connection: &T::Connection) -> Result<(), SessionError> {
        let timings = self.profile.timings;

        self.transition(SessionState::Authenticating);

        // Subscribe before anything is written so that no response is missed
        let sink = Arc::clone(&self.sink);
        let handler: NotificationHandler = Arc::new(move |payload: Vec<u8>| route_notification(sink.as_ref(), &payload));
        self.transport
            .subscribe_notify(connection, self.profile.notify_characteristic, handler)
            .await?;

        self.send(connection, self.profile.auth_characteristic, self.profile.auth_payload, true)
            .await?;
        if unless_stopped(&mut self.stop, sleep(timings.settle_delay)).await.is_none() {
            return Ok(());
        }

        self.transition(SessionState::Active);

        while self.transport.is_connected(connection).await {
            self.send_keepalive(connection, self.profile.heartbeat).await?;
            if unless_stopped(&mut self.stop, sleep(timings.heartbeat_gap)).await.is_none() {
                return Ok(());
            }

            self.send_keepalive(connection, self.profile.data_request).await?;
            if unless_stopped(&mut self.stop, sleep(timings.request_gap)).await.is_none() {
                return Ok(());
            }
        }

        info!("device disconnected");
        Err(SessionError::TransportDisconnected)
    }

    /// A failed cadence write means the link is gone
    async fn send_keepalive(&self, connection: &T::Connection, command: &[u8]) -> Result<(), SessionError> {
        self.send(connection, self.profile.write_characteristic, command, false)
            .await
            .map_err(|err| {
                warn!(%err, "cadence write failed");
                SessionError::TransportDisconnected
            })
    }

    async fn send(
        &self,
        connection: &T::Connection,
        characteristic: Uuid,
        data: &[u8],
        require_response: bool,
    ) -> Result<(), TransportError> {
        let h = hex::encode(data);
        trace!(%characteristic, "TX: {h}");
        self.transport.write(connection, characteristic, data, require_response).await
    }

    fn transition(&mut self, next: SessionState) {
        assert!(
            self.state.can_transition_to(next),
            "invalid session transition {:?} -> {:?}",
            self.state,
            next
        );
        info!(from = ?self.state, to = ?next, "session state changed");
        self.state = next;
        self.sink.on_session_state_change(next);
    }
}

/// Decode one notification and hand the outcome to the sink.
///
/// Responses to anything other than a data request are dropped silently.
fn route_notification(sink: &dyn TelemetrySink, payload: &[u8]) {
    let h = hex::encode(payload);
    trace!("RX notification: 0x{h}");

    match decode(payload) {
        Ok(frame) => sink.on_frame(frame),
        Err(DecodeError::UnrecognizedFrameType(marker)) => {
            trace!("ignoring frame type 0x{marker:02X}");
        }
        Err(err) => {
            warn!(%err, "failed to decode notification: 0x{h}");
            sink.on_decode_error(err);
        }
    }
}

/// Run `fut` unless a stop is requested first, in which case `None` is returned
async fn unless_stopped<F: Future>(stop: &mut watch::Receiver<bool>, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = stop_requested(stop) => None,
        output = fut => Some(output),
    }
}

async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            // Every handle is gone, so nobody can ask any more
            std::future::pending::<()>().await;
        }
    }
}
