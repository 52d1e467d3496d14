use bytes::{Buf, Bytes};

use crate::error::{protocol_err, Error};
use crate::io::{BufExt, Decode};
use crate::protocol::capabilities::Capabilities;

/// `ERR_Packet`: a fatal or recoverable error response.
#[derive(Debug, Clone)]
pub struct ErrPacket {
    pub error_code: u16,
    pub sql_state: Option<String>,
    pub error_message: String,
}

impl<'de> Decode<'de, Capabilities> for ErrPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self, Error> {
        let header = buf.get_u8();

        if header != 0xff {
            return Err(protocol_err!("expected ERR_Packet (0xff); received 0x{:x}", header));
        }

        let error_code = buf.get_u16_le();

        let sql_state = if capabilities.contains(Capabilities::PROTOCOL_41) && buf.has_remaining() {
            // marker '#' followed by the 5-byte SQLSTATE
            let marker = buf.get_u8();
            if marker == b'#' {
                Some(String::from_utf8_lossy(&buf.get_bytes(5)?).into_owned())
            } else {
                None
            }
        } else {
            None
        };

        let error_message = buf.get_str_eof()?;

        Ok(Self {
            error_code,
            sql_state,
            error_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_err_packet() {
        let mut raw = vec![0xff, 0x19, 0x04, b'#'];
        raw.extend_from_slice(b"42000");
        raw.extend_from_slice(b"Unknown database 'foo'");

        let err = ErrPacket::decode_with(Bytes::from(raw), Capabilities::PROTOCOL_41).unwrap();

        assert_eq!(err.error_code, 1049);
        assert_eq!(err.sql_state.as_deref(), Some("42000"));
        assert_eq!(err.error_message, "Unknown database 'foo'");
    }
}
