//! The BLE operations a [`crate::Session`] depends on.

use std::sync::Arc;

use async_trait::async_trait;
use bluest::Uuid;
use tokio::time::Duration;

use crate::error::TransportError;

/// Called with every notification payload, on whatever task the transport delivers it.
pub type NotificationHandler = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// A discovered but unconnected device
    type Device: Send;
    type Connection: Send + Sync;

    /// Scan for a device by address or name. `None` when nothing matched within `timeout`.
    async fn discover_by_address(&self, address: &str, timeout: Duration) -> Option<Self::Device>;

    async fn connect(&self, device: Self::Device) -> Result<Self::Connection, TransportError>;

    /// Enable notifications on `characteristic`. Returns once the subscription is live.
    async fn subscribe_notify(
        &self,
        connection: &Self::Connection,
        characteristic: Uuid,
        handler: NotificationHandler,
    ) -> Result<(), TransportError>;

    async fn write(
        &self,
        connection: &Self::Connection,
        characteristic: Uuid,
        data: &[u8],
        require_response: bool,
    ) -> Result<(), TransportError>;

    async fn is_connected(&self, connection: &Self::Connection) -> bool;

    async fn disconnect(&self, connection: &Self::Connection) -> Result<(), TransportError>;
}
