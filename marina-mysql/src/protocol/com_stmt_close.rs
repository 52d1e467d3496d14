use crate::io::{BufMutExt, Encode};

/// `COM_STMT_CLOSE`: deallocate a prepared statement. Fire-and-forget; the
/// server sends no response (spec 4.6).
#[derive(Debug)]
pub struct ComStmtClose {
    pub statement_id: u32,
}

impl<'en> Encode<'en> for ComStmtClose {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.put_u8(0x19);
        buf.put_u32_le(self.statement_id);
    }
}
