/// A verbatim keep-alive message addressed to register 0x92. The device stops streaming without it.
pub(crate) const REQUEST: [u8; super::COMMAND_LEN] =
    [0x7E, 0x00, 0x01, 0x03, 0x00, 0x92, 0x00, 0x00, 0x9F, 0x22, 0x0D];
