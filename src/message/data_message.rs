use crate::error::DecodeError;
use crate::telemetry_frame::{BatteryStatus, TelemetryFrame};

/// A verbatim message to send which requests the telemetry data response from register 0x8C
pub(crate) const REQUEST: [u8; super::COMMAND_LEN] =
    [0x1E, 0x00, 0x01, 0x03, 0x00, 0x8C, 0x00, 0x00, 0xB1, 0x44, 0x0D];

/// Register echoed at byte 5 of a data response
pub const DATA_RESPONSE_MARKER: u8 = 0x8C;

const MARKER_OFFSET: usize = 5;
const MIN_FRAME_LEN: usize = 10;
const PAYLOAD_OFFSET: usize = 8;
const KELVIN_TENTHS_OFFSET: i32 = 2731;

/// Decode one data response notification.
///
/// The message format is:
///
/// Start Byte | Length | Meaning
/// 0          | 8      | Header. Byte 5 is the register, 0x8C for a data response
/// 8          | 1      | Number of cells N
/// 9          | 2N     | Cell voltages in mV
/// 9+2N       | 1      | Number of temperature sensors M
/// 10+2N      | 2M     | Temperatures in K/10
/// 10+2N+2M   | 2      | Current in A/10, status in the top 2 bits
/// ..         | 2      | Battery voltage in V/100
/// ..         | 2      | Remaining capacity in Ah/10
/// ..         | 2      | Full capacity in Ah/10
/// ..         | 2      | Cycle count
/// ..         | 2      | Design capacity in Ah/10
/// ..         | 2      | State of charge in %
///
/// All words are big endian. Anything after the state of charge is ignored.
pub fn decode(raw: &[u8]) -> Result<TelemetryFrame, DecodeError> {
    if raw.len() < MIN_FRAME_LEN {
        return Err(DecodeError::Malformed("frame too short"));
    }

    let marker = raw[MARKER_OFFSET];
    if marker != DATA_RESPONSE_MARKER {
        return Err(DecodeError::UnrecognizedFrameType(marker));
    }

    let mut reader = Reader::new(raw, PAYLOAD_OFFSET);

    let num_cells = reader.read_u8()?;
    let cell_voltages = (0..num_cells)
        .map(|_| reader.read_u16().map(|mv| f64::from(mv) / 1000.0))
        .collect::<Result<Vec<_>, _>>()?;

    let num_temps = reader.read_u8()?;
    let temperatures = (0..num_temps)
        .map(|_| reader.read_u16().map(decode_temperature))
        .collect::<Result<Vec<_>, _>>()?;

    let (current, status) = decode_current_status(reader.read_u16()?);
    let total_voltage = f64::from(reader.read_u16()?) / 100.0;
    let remaining_capacity = f64::from(reader.read_u16()?) / 10.0;
    let full_capacity = f64::from(reader.read_u16()?) / 10.0;
    let cycle_count = reader.read_u16()?;
    let design_capacity = f64::from(reader.read_u16()?) / 10.0;
    let state_of_charge = reader.read_u16()?;

    Ok(TelemetryFrame {
        cell_voltages,
        temperatures,
        current,
        status,
        total_voltage,
        remaining_capacity,
        full_capacity,
        design_capacity,
        cycle_count,
        state_of_charge,
    })
}

/// Split the combined current/status word.
///
/// The top two bits carry the status, the low 14 bits the magnitude in A/10.
/// Only `Discharging` flips the sign; `Protect` and `Idle` keep the raw magnitude
/// because the real sign under protection has not been confirmed on hardware.
pub fn decode_current_status(raw: u16) -> (f64, BatteryStatus) {
    let status = match (raw >> 14) & 0b11 {
        0b11 => BatteryStatus::Discharging,
        0b10 => BatteryStatus::Charging,
        0b01 => BatteryStatus::Protect,
        _ => BatteryStatus::Idle,
    };

    let magnitude = f64::from(raw & 0x3FFF) / 10.0;
    let current = if status == BatteryStatus::Discharging {
        -magnitude
    } else {
        magnitude
    };

    (current, status)
}

/// Convert K/10 to °C. The integer division by 10 already lands on 0.1° resolution.
fn decode_temperature(raw: u16) -> f64 {
    f64::from(i32::from(raw) - KELVIN_TENTHS_OFFSET) / 10.0
}

/// Bounds checked big endian cursor over a notification payload
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or(DecodeError::Truncated { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self
            .buf
            .get(self.pos..self.pos + 2)
            .ok_or(DecodeError::Truncated { offset: self.pos })?;
        self.pos += 2;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2 cells, 1 temperature sensor, charging at 5A
    const CHARGING: &str = "1e000103008c0000 02 0ce4 0cee 01 0adb 8032 1388 03e8 03e8 000c 041a 0057";

    fn frame_bytes(s: &str) -> Vec<u8> {
        hex::decode(s.replace(' ', "")).unwrap()
    }

    fn charging_frame() -> TelemetryFrame {
        TelemetryFrame {
            cell_voltages: vec![3.300, 3.310],
            temperatures: vec![4.8],
            current: 5.0,
            status: BatteryStatus::Charging,
            total_voltage: 50.00,
            remaining_capacity: 100.0,
            full_capacity: 100.0,
            design_capacity: 105.0,
            cycle_count: 12,
            state_of_charge: 87,
        }
    }

    #[test]
    fn test_decode_charging() {
        let raw = frame_bytes(CHARGING);
        assert_eq!(raw.len(), 30);
        assert_eq!(decode(&raw), Ok(charging_frame()));
    }

    #[test]
    fn test_decode_discharging() {
        let mut raw = frame_bytes(CHARGING);
        // current/status word lives at 16..18 with 2 cells and 1 sensor
        raw[16] = 0xC0;
        raw[17] = 0x32;

        let frame = decode(&raw).unwrap();
        assert_eq!(frame.current, -5.0);
        assert_eq!(frame.status, BatteryStatus::Discharging);
        assert_eq!(frame.cell_voltages, charging_frame().cell_voltages);
    }

    #[test]
    fn test_decode_is_repeatable() {
        let raw = frame_bytes(CHARGING);
        assert_eq!(decode(&raw), decode(&raw));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut raw = frame_bytes(CHARGING);
        raw.extend_from_slice(&[0xAB, 0xCD, 0x0D]);
        assert_eq!(decode(&raw), Ok(charging_frame()));
    }

    #[test]
    fn test_decode_no_cells_or_sensors() {
        let raw = frame_bytes("7e000103008c00000000 0000 0514 0000 0000 0000 0000 0000");
        let frame = decode(&raw).unwrap();
        assert!(frame.cell_voltages.is_empty());
        assert!(frame.temperatures.is_empty());
        assert_eq!(frame.status, BatteryStatus::Idle);
        assert_eq!(frame.total_voltage, 13.0);
    }

    #[test]
    fn test_decode_temperatures() {
        assert_eq!(decode_temperature(2761), 3.0);
        assert_eq!(decode_temperature(2779), 4.8);
        assert_eq!(decode_temperature(2731), 0.0);
        assert_eq!(decode_temperature(2631), -10.0);
        assert_eq!(decode_temperature(0), -273.1);
    }

    #[test]
    fn test_decode_state_of_charge_passes_through() {
        let mut raw = frame_bytes(CHARGING);
        raw[28] = 0x01;
        raw[29] = 0x2C;
        assert_eq!(decode(&raw).unwrap().state_of_charge, 300);
    }

    #[test]
    fn test_decode_too_short() {
        let raw = frame_bytes("1e000103008c000002");
        assert_eq!(decode(&raw), Err(DecodeError::Malformed("frame too short")));
        assert_eq!(decode(&[]), Err(DecodeError::Malformed("frame too short")));
    }

    #[test]
    fn test_decode_other_marker() {
        let mut raw = frame_bytes(CHARGING);
        raw[5] = 0x1E;
        assert_eq!(decode(&raw), Err(DecodeError::UnrecognizedFrameType(0x1E)));

        raw[5] = 0x92;
        assert_eq!(decode(&raw), Err(DecodeError::UnrecognizedFrameType(0x92)));
    }

    #[test]
    fn test_decode_truncated_prefixes() {
        let raw = frame_bytes(CHARGING);
        for len in MIN_FRAME_LEN..raw.len() {
            match decode(&raw[..len]) {
                Err(DecodeError::Truncated { offset }) => assert!(offset < raw.len()),
                other => panic!("length {len}: expected truncation, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_decode_truncated_offsets() {
        let raw = frame_bytes(CHARGING);
        // second byte of the first cell voltage is missing
        assert_eq!(decode(&raw[..10]), Err(DecodeError::Truncated { offset: 9 }));
        // state of charge is missing
        assert_eq!(decode(&raw[..29]), Err(DecodeError::Truncated { offset: 28 }));
    }

    #[test]
    fn test_decode_missing_sensor_count() {
        // declares one cell and then ends before the temperature count
        let raw = frame_bytes("1e000103008c0000010ce4");
        assert_eq!(decode(&raw), Err(DecodeError::Truncated { offset: 11 }));
    }

    #[test]
    fn test_decode_declared_counts_exceed_buffer() {
        let mut raw = frame_bytes(CHARGING);
        raw[8] = 0xFF;
        assert!(matches!(decode(&raw), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_decode_current_status_all_values() {
        for raw in 0..=u16::MAX {
            let (current, status) = decode_current_status(raw);
            let expected_status = match raw >> 14 {
                0 => BatteryStatus::Idle,
                1 => BatteryStatus::Protect,
                2 => BatteryStatus::Charging,
                _ => BatteryStatus::Discharging,
            };
            assert_eq!(status, expected_status);

            let magnitude = f64::from(raw & 0x3FFF) / 10.0;
            assert_eq!(current.abs(), magnitude);
            assert_eq!(current.is_sign_negative(), status == BatteryStatus::Discharging);
        }
    }

    #[test]
    fn test_decode_current_status_examples() {
        assert_eq!(decode_current_status(0x8032), (5.0, BatteryStatus::Charging));
        assert_eq!(decode_current_status(0xC032), (-5.0, BatteryStatus::Discharging));
        assert_eq!(decode_current_status(0x4064), (10.0, BatteryStatus::Protect));
        assert_eq!(decode_current_status(0x0000), (0.0, BatteryStatus::Idle));
    }
}
