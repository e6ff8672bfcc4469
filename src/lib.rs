//! Live telemetry from WattCycle-style LiFePO4 Battery Management Systems over Bluetooth Low Energy
//!
//! The BMS exposes a vendor service (`0000fff0-…`) with three characteristics: one for
//! notifications, one for commands and one which takes a fixed authentication payload.
//! After authenticating, the device only keeps streaming while it receives a heartbeat
//! command followed by a data request command on a fixed cadence. Each data request is
//! answered, usually, by one notification carrying a complete data response.
//!
//! Currently the following data can be accessed:
//!
//! - Cell voltages (V)
//! - Temperatures (°C)
//! - Current (A) and charge status
//! - Battery voltage (V)
//! - Remaining, full and design capacity (Ah)
//! - Cycles (count)
//! - State of charge (%)
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use wattread::{BleTransport, ChannelSink, DeviceProfile, Session, SessionEvent};
//! #
//! # #[tokio::main]
//! # pub async fn main() -> anyhow::Result<()> {
//!     let profile = DeviceProfile::default();
//!     let transport = BleTransport::new(profile.service).await?;
//!     let (sink, mut events) = ChannelSink::new(ChannelSink::DEFAULT_CAPACITY);
//!     let (session, _stop) = Session::new(transport, profile, Arc::new(sink));
//!     tokio::spawn(session.run());
//!
//!     while let Some(event) = events.recv().await {
//!         if let SessionEvent::Frame(frame) = event {
//!             println!("{frame:?}");
//!         }
//!     }
//! #   Ok(())
//! # }
//! ```
//!
//! The decoder can also be used on its own:
//!
//! ```
//! let raw = [
//!     0x1e, 0x00, 0x01, 0x03, 0x00, 0x8c, 0x00, 0x00, // header
//!     0x01, 0x0c, 0xe4, // 1 cell, 3300mV
//!     0x00, // no temperature sensors
//!     0xc0, 0x14, // discharging at 2A
//!     0x05, 0x28, 0x03, 0xe8, 0x03, 0xe8, 0x00, 0x02, 0x03, 0xe8, 0x00, 0x64,
//! ];
//! let frame = wattread::decode(&raw).unwrap();
//! assert_eq!(frame.current, -2.0);
//! assert_eq!(frame.state_of_charge, 100);
//! ```

mod ble_transport;
pub mod config;
mod device_profile;
mod error;
mod message;
pub mod render;
mod session;
mod sink;
mod telemetry_frame;
mod transport;

pub use ble_transport::{BleConnection, BleTransport};
pub use config::Config;
pub use device_profile::{DeviceProfile, Timings};
pub use error::{ConfigError, DecodeError, SessionError, TransportError};
pub use message::data_message::{decode, decode_current_status, DATA_RESPONSE_MARKER};
pub use message::is_valid_command;
pub use session::{Session, SessionState, StopHandle};
pub use sink::{ChannelSink, Reading, SessionEvent, TelemetrySink};
pub use telemetry_frame::{BatteryStatus, TelemetryFrame};
pub use transport::{NotificationHandler, Transport};
