use bluest::Uuid;
use tokio::time::Duration;

use crate::message::{auth_message, data_message, heartbeat_message, is_valid_command};

/// Everything the session needs to know about one model of BMS.
///
/// The values are fixed for the lifetime of a [`crate::Session`]. The default is the
/// WattCycle profile; tests substitute their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// BLE address or advertised name of the device to connect to
    pub address: String,
    pub service: Uuid,
    pub notify_characteristic: Uuid,
    pub write_characteristic: Uuid,
    pub auth_characteristic: Uuid,
    pub auth_payload: &'static [u8],
    pub heartbeat: &'static [u8],
    pub data_request: &'static [u8],
    pub timings: Timings,
}

/// The cadence which keeps the device streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub discovery_timeout: Duration,
    /// Grace period after authenticating. Nothing is negotiated.
    pub settle_delay: Duration,
    /// Wait between the heartbeat and the data request
    pub heartbeat_gap: Duration,
    /// Wait between the data request and the next heartbeat
    pub request_gap: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            discovery_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(1000),
            heartbeat_gap: Duration::from_millis(500),
            request_gap: Duration::from_millis(1000),
        }
    }
}

impl DeviceProfile {
    pub const DEFAULT_ADDRESS: &'static str = "C0:D6:3C:58:A4:10";
    pub const SERVICE_ID: Uuid = Uuid::from_u128(0x0000fff0_0000_1000_8000_00805f9b34fb);
    pub const NOTIFY_CHARACTERISTIC_ID: Uuid = Uuid::from_u128(0x0000fff1_0000_1000_8000_00805f9b34fb);
    pub const WRITE_CHARACTERISTIC_ID: Uuid = Uuid::from_u128(0x0000fff2_0000_1000_8000_00805f9b34fb);
    pub const AUTH_CHARACTERISTIC_ID: Uuid = Uuid::from_u128(0x0000fffa_0000_1000_8000_00805f9b34fb);

    /// The profile of the WattCycle 12V battery at the given address
    pub fn wattcycle(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            service: Self::SERVICE_ID,
            notify_characteristic: Self::NOTIFY_CHARACTERISTIC_ID,
            write_characteristic: Self::WRITE_CHARACTERISTIC_ID,
            auth_characteristic: Self::AUTH_CHARACTERISTIC_ID,
            auth_payload: auth_message::PAYLOAD,
            heartbeat: &heartbeat_message::REQUEST,
            data_request: &data_message::REQUEST,
            timings: Timings::default(),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Check that both commands carry a correct checksum and terminator
    pub fn validate(&self) -> Result<(), &'static str> {
        if !is_valid_command(self.heartbeat) {
            return Err("heartbeat command is not a valid frame");
        }
        if !is_valid_command(self.data_request) {
            return Err("data request command is not a valid frame");
        }
        Ok(())
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::wattcycle(Self::DEFAULT_ADDRESS)
    }
}
