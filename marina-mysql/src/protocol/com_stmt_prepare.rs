use crate::io::{BufMutExt, Encode};

/// `COM_STMT_PREPARE`: ask the server to prepare `query`, returning a
/// statement id usable by `COM_STMT_EXECUTE` (spec 4.6).
#[derive(Debug)]
pub struct ComStmtPrepare<'a> {
    pub query: &'a str,
}

impl<'en> Encode<'en> for ComStmtPrepare<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.put_u8(0x16);
        buf.put_str_eof(self.query);
    }
}
