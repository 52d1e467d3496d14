use bytes::{Buf, Bytes};

use crate::error::{protocol_err, Error};
use crate::io::{BufExt, Decode};
use crate::protocol::capabilities::Capabilities;
use crate::protocol::status::Status;

/// `OK_Packet`: terminates a command successfully.
#[derive(Debug, Clone)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status: Status,
    pub warnings: u16,
    pub info: String,
}

impl<'de> Decode<'de, Capabilities> for OkPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self, Error> {
        let header = buf.get_u8();

        if header != 0x00 && header != 0xfe {
            return Err(protocol_err!(
                "expected OK_Packet (0x00 or 0xfe); received 0x{:x}",
                header
            ));
        }

        let affected_rows = buf.get_uint_lenenc()?.unwrap_or(0);
        let last_insert_id = buf.get_uint_lenenc()?.unwrap_or(0);

        let status = if capabilities.contains(Capabilities::PROTOCOL_41) {
            Status::from_bits_truncate(buf.get_u16_le())
        } else {
            Status::empty()
        };

        let warnings = if capabilities.contains(Capabilities::PROTOCOL_41) {
            buf.get_u16_le()
        } else {
            0
        };

        let info = buf.get_str_eof()?;

        Ok(Self {
            affected_rows,
            last_insert_id,
            status,
            warnings,
            info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ok_packet() {
        let buf = Bytes::from_static(&[0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00]);
        let ok = OkPacket::decode_with(buf, Capabilities::PROTOCOL_41).unwrap();

        assert_eq!(ok.affected_rows, 1);
        assert_eq!(ok.last_insert_id, 0);
        assert_eq!(ok.status, Status::SERVER_STATUS_AUTOCOMMIT);
        assert_eq!(ok.warnings, 0);
    }
}
