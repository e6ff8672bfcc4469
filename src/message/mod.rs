//! The wire messages exchanged with the BMS.
//!
//! Outbound commands are fixed 11 byte frames:
//!
//! Start Byte | End Byte | Meaning
//! 0          | 7        | Header. Byte 5 is the register being addressed
//! 8          | 9        | A MODBUS CRC over bytes 0-7, big endian
//! 10         | 10       | Terminator, always 0x0D
//!
//! The device answers a command with a notification whose byte 5 echoes the register.

pub(crate) mod auth_message;
pub(crate) mod data_message;
pub(crate) mod heartbeat_message;

use crc16::{State, MODBUS};

pub(crate) const COMMAND_LEN: usize = 11;
const COMMAND_TERMINATOR: u8 = 0x0D;

/// Compute the CRC check value for the given bytes
fn crc(data: &[u8]) -> [u8; 2] {
    State::<MODBUS>::calculate(data).to_be_bytes()
}

/// Check the length, checksum and terminator of an outbound command frame
pub fn is_valid_command(cmd: &[u8]) -> bool {
    cmd.len() == COMMAND_LEN
        && cmd[COMMAND_LEN - 1] == COMMAND_TERMINATOR
        && cmd[8..10] == crc(&cmd[0..8])
}

#[test]
fn test_checksum() {
    let header = [0x1E, 0x00, 0x01, 0x03, 0x00, 0x8C, 0x00, 0x00];
    assert_eq!(State::<MODBUS>::calculate(&header), 0xb144);
}

#[test]
fn test_builtin_commands_are_valid() {
    assert!(is_valid_command(&heartbeat_message::REQUEST));
    assert!(is_valid_command(&data_message::REQUEST));
}

#[test]
fn test_invalid_commands() {
    let mut bad_crc = data_message::REQUEST;
    bad_crc[9] ^= 0x01;
    assert!(!is_valid_command(&bad_crc));

    let mut bad_terminator = heartbeat_message::REQUEST;
    bad_terminator[10] = 0x0A;
    assert!(!is_valid_command(&bad_terminator));

    assert!(!is_valid_command(&data_message::REQUEST[..10]));
    assert!(!is_valid_command(&[]));
}
