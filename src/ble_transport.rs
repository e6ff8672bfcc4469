//! [`Transport`] over the platform Bluetooth stack, via `bluest`.

use std::future::Future;
use std::sync::Mutex;

use async_trait::async_trait;
use bluest::{Adapter, Characteristic, Device, Uuid};
use futures_util::{Stream, StreamExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::transport::{NotificationHandler, Transport};

pub struct BleTransport {
    adapter: Adapter,
    service: Uuid,
}

/// A connected device and the characteristics of its service
pub struct BleConnection {
    device: Device,
    characteristics: Vec<Characteristic>,
    subscriptions: Mutex<Vec<JoinHandle<()>>>,
}

impl BleConnection {
    fn characteristic(&self, id: Uuid) -> Result<&Characteristic, TransportError> {
        self.characteristics
            .iter()
            .find(|c| c.uuid() == id)
            .ok_or(TransportError::CharacteristicNotFound(id))
    }
}

impl Drop for BleConnection {
    fn drop(&mut self) {
        if let Ok(subscriptions) = self.subscriptions.get_mut() {
            for task in subscriptions.drain(..) {
                task.abort();
            }
        }
    }
}

impl BleTransport {
    /// Open the default adapter. Only devices advertising `service` will be discovered.
    pub async fn new(service: Uuid) -> Result<Self, TransportError> {
        let adapter = Adapter::default()
            .await
            .ok_or(TransportError::AdapterUnavailable)?;
        adapter.wait_available().await?;

        Ok(Self { adapter, service })
    }

    async fn scan_for(&self, address: &str) -> Result<Option<Device>, TransportError> {
        let required_services = [self.service];
        let mut adapter_events = self.adapter.scan(&required_services).await?;
        while let Some(advertising) = adapter_events.next().await {
            if Self::matches(&advertising.device, address).await {
                return Ok(Some(advertising.device));
            }
        }

        Ok(None)
    }

    async fn discover_characteristics(&self, device: &Device) -> Result<Vec<Characteristic>, TransportError> {
        let service = device
            .discover_services_with_uuid(self.service)
            .await?
            .first()
            .ok_or(TransportError::ServiceNotFound(self.service))?
            .clone();
        let characteristics = service.discover_characteristics().await?;
        debug!(count = characteristics.len(), "discovered characteristics");
        Ok(characteristics)
    }

    /// Platforms expose either a MAC address or an opaque id, so accept the advertised name too
    async fn matches(device: &Device, address: &str) -> bool {
        let address = address.to_uppercase();
        let id = format!("{:?}", device.id()).to_uppercase();
        if id.contains(&address) {
            return true;
        }

        match device.name_async().await {
            Ok(name) => name.to_uppercase() == address,
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Transport for BleTransport {
    type Device = Device;
    type Connection = BleConnection;

    async fn discover_by_address(&self, address: &str, scan_timeout: Duration) -> Option<Device> {
        match timeout(scan_timeout, self.scan_for(address)).await {
            Ok(Ok(Some(device))) => {
                info!(id = ?device.id(), "device found");
                Some(device)
            }
            Ok(Ok(None)) => None,
            Ok(Err(err)) => {
                warn!(%err, "scan failed");
                None
            }
            Err(_) => None,
        }
    }

    async fn connect(&self, device: Device) -> Result<BleConnection, TransportError> {
        self.adapter.connect_device(&device).await?;

        // The link is up from here on, so any failure must take it down again
        let characteristics = release_on_error(self.discover_characteristics(&device).await, || async {
            if let Err(err) = self.adapter.disconnect_device(&device).await {
                warn!(%err, "failed to disconnect after setup error");
            }
        })
        .await?;

        Ok(BleConnection {
            device,
            characteristics,
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    async fn subscribe_notify(
        &self,
        connection: &BleConnection,
        characteristic: Uuid,
        handler: NotificationHandler,
    ) -> Result<(), TransportError> {
        let notify = connection.characteristic(characteristic)?.clone();
        let (ready_tx, ready_rx) = oneshot::channel();

        let adapter = self.adapter.clone();
        let device = connection.device.clone();
        let task = tokio::spawn(async move {
            let reader = match notify.notify().await {
                Ok(reader) => {
                    let _ = ready_tx.send(Ok(()));
                    reader
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };

            match forward_notifications(reader, handler.as_ref()).await {
                Ok(()) => debug!("end of notification stream"),
                Err(err) => {
                    // Without notifications the cadence is pointless, so drop the link and let
                    // the session see it as a disconnect
                    warn!(%err, "notification error, disconnecting");
                    if let Err(err) = adapter.disconnect_device(&device).await {
                        warn!(%err, "failed to disconnect");
                    }
                }
            }
        });

        if let Ok(mut subscriptions) = connection.subscriptions.lock() {
            subscriptions.push(task);
        }

        match ready_rx.await {
            Ok(result) => result.map_err(TransportError::from),
            Err(_) => Err(TransportError::Rejected("notification task ended".to_string())),
        }
    }

    async fn write(
        &self,
        connection: &BleConnection,
        characteristic: Uuid,
        data: &[u8],
        require_response: bool,
    ) -> Result<(), TransportError> {
        let target = connection.characteristic(characteristic)?;
        if require_response {
            target.write(data).await?;
        } else {
            target.write_without_response(data).await?;
        }
        Ok(())
    }

    async fn is_connected(&self, connection: &BleConnection) -> bool {
        connection.device.is_connected().await
    }

    async fn disconnect(&self, connection: &BleConnection) -> Result<(), TransportError> {
        self.adapter.disconnect_device(&connection.device).await?;
        Ok(())
    }
}

/// Hand every notification to `handler` until the stream ends or yields an error
async fn forward_notifications<S, E>(reader: S, handler: &(dyn Fn(Vec<u8>) + Send + Sync)) -> Result<(), E>
where
    S: Stream<Item = Result<Vec<u8>, E>>,
{
    let mut reader = std::pin::pin!(reader);
    while let Some(notification) = reader.next().await {
        handler(notification?);
    }
    Ok(())
}

/// Run `release` before passing an error on
async fn release_on_error<T, F, Fut>(result: Result<T, TransportError>, release: F) -> Result<T, TransportError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    if result.is_err() {
        release().await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn collector() -> (Arc<Mutex<Vec<Vec<u8>>>>, impl Fn(Vec<u8>) + Send + Sync) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        (received, move |data: Vec<u8>| sink.lock().unwrap().push(data))
    }

    #[tokio::test]
    async fn test_forward_notifications_until_end() {
        let (received, handler) = collector();
        let reader = stream::iter(vec![Ok::<_, &str>(vec![1]), Ok(vec![2])]);

        assert_eq!(forward_notifications(reader, &handler).await, Ok(()));
        assert_eq!(*received.lock().unwrap(), vec![vec![1], vec![2]]);
    }

    #[tokio::test]
    async fn test_forward_notifications_stops_at_error() {
        let (received, handler) = collector();
        let reader = stream::iter(vec![Ok(vec![1]), Err("link lost"), Ok(vec![3])]);

        assert_eq!(forward_notifications(reader, &handler).await, Err("link lost"));
        assert_eq!(*received.lock().unwrap(), vec![vec![1]]);
    }

    #[tokio::test]
    async fn test_release_on_error_releases() {
        let released = AtomicBool::new(false);
        let result: Result<(), _> = release_on_error(Err(TransportError::ServiceNotFound(Uuid::nil())), || async {
            released.store(true, Ordering::SeqCst);
        })
        .await;

        assert!(matches!(result, Err(TransportError::ServiceNotFound(_))));
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_release_on_error_keeps_success() {
        let released = AtomicBool::new(false);
        let result = release_on_error(Ok(7), || async {
            released.store(true, Ordering::SeqCst);
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert!(!released.load(Ordering::SeqCst));
    }
}
