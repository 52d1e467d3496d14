use crate::io::{BufMutExt, Encode};

/// `COM_QUERY`: execute a SQL statement via the text protocol.
#[derive(Debug)]
pub struct ComQuery<'a> {
    pub sql: &'a str,
}

impl<'en> Encode<'en> for ComQuery<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.put_u8(0x03);
        buf.put_str_eof(self.sql);
    }
}
