use bytes::{Buf, Bytes};

use crate::error::{protocol_err, Error};
use crate::io::Decode;
use crate::protocol::status::Status;

/// `EOF_Packet`: legacy terminal packet, superseded by `OK_Packet` when
/// `CLIENT_DEPRECATE_EOF` is negotiated.
#[derive(Debug, Clone)]
pub struct EofPacket {
    pub warnings: u16,
    pub status: Status,
}

impl<'de> Decode<'de, ()> for EofPacket {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let header = buf.get_u8();

        if header != 0xfe {
            return Err(protocol_err!("expected EOF_Packet (0xfe); received 0x{:x}", header));
        }

        let warnings = buf.get_u16_le();
        let status = Status::from_bits_truncate(buf.get_u16_le());

        Ok(Self { warnings, status })
    }
}
