use crate::io::{BufMutExt, Encode};

/// `COM_STMT_RESET`: clears any long-data buffered on the server for this
/// statement without deallocating it (spec 4.6).
#[derive(Debug)]
pub struct ComStmtReset {
    pub statement_id: u32,
}

impl<'en> Encode<'en> for ComStmtReset {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.put_u8(0x1a);
        buf.put_u32_le(self.statement_id);
    }
}
