use crate::io::{BufMutExt, Encode};
use crate::protocol::capabilities::Capabilities;

/// Sent in place of a `HandshakeResponse` when the client requests a TLS
/// upgrade: the server reads just the capability/charset prefix, then both
/// sides perform the TLS handshake before the real `HandshakeResponse` is
/// sent over the encrypted stream (spec 4.3, "TLS upgrade").
#[derive(Debug)]
pub struct SslRequest {
    pub max_packet_size: u32,
    pub collation: u8,
}

impl<'en> Encode<'en, Capabilities> for SslRequest {
    fn encode_with(&self, buf: &mut Vec<u8>, capabilities: Capabilities) {
        buf.put_uint_le(capabilities.bits() as u64, 4);
        buf.put_uint_le(self.max_packet_size as u64, 4);
        buf.put_u8(self.collation);

        // 19 reserved bytes
        buf.extend_from_slice(&[0u8; 19]);

        if !capabilities.contains(Capabilities::MYSQL) {
            buf.put_uint_le((capabilities.bits() >> 32) as u64, 4);
        } else {
            buf.extend_from_slice(&[0u8; 4]);
        }
    }
}
