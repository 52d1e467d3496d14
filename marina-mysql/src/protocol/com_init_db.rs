use crate::io::{BufMutExt, Encode};

/// `COM_INIT_DB`: change the default schema for the connection.
#[derive(Debug)]
pub struct ComInitDb<'a> {
    pub schema: &'a str,
}

impl<'en> Encode<'en> for ComInitDb<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.put_u8(0x02);
        buf.put_str_eof(self.schema);
    }
}
