use crate::io::{BufMutExt, Encode};

/// `COM_STMT_SEND_LONG_DATA`: stream a parameter value too large to inline
/// in `COM_STMT_EXECUTE` (spec 4.6, "long data"). May be sent multiple times
/// for the same `param_id`; the server appends each chunk.
#[derive(Debug)]
pub struct ComStmtSendLongData<'a> {
    pub statement_id: u32,
    pub param_id: u16,
    pub data: &'a [u8],
}

impl<'en> Encode<'en> for ComStmtSendLongData<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.put_u8(0x18);
        buf.put_u32_le(self.statement_id);
        buf.put_u16_le(self.param_id);
        buf.extend_from_slice(self.data);
    }
}
