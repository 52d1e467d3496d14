use bytes::{Buf, Bytes};

use crate::error::{protocol_err, Error};
use crate::io::Decode;

/// The response header to `COM_STMT_PREPARE`: a statement id plus the
/// number of parameter/result columns to expect in the packets that follow
/// (spec 4.6).
#[derive(Debug)]
pub struct ComStmtPrepareOk {
    pub statement_id: u32,
    pub num_columns: u16,
    pub num_params: u16,
    pub warning_count: u16,
}

impl<'de> Decode<'de, ()> for ComStmtPrepareOk {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let header = buf.get_u8();
        if header != 0x00 {
            return Err(protocol_err!("expected COM_STMT_PREPARE_OK (0x00); received 0x{:x}", header));
        }

        let statement_id = buf.get_u32_le();
        let num_columns = buf.get_u16_le();
        let num_params = buf.get_u16_le();

        // reserved
        buf.advance(1);

        let warning_count = buf.get_u16_le();

        Ok(Self { statement_id, num_columns, num_params, warning_count })
    }
}
