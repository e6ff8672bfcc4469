/// Written once to the auth characteristic after subscribing. The device never acknowledges it.
pub(crate) const PAYLOAD: &[u8] = b"HiLink";
