use bytes::{Buf, Bytes};

use crate::error::{protocol_err, Error};
use crate::io::{BufExt, Decode};

/// `0xFB filename`: the server's request to stream a local file for `LOAD
/// DATA LOCAL INFILE` (spec 4.7).
#[derive(Debug)]
pub struct LocalInfileRequest {
    pub filename: String,
}

impl<'de> Decode<'de, ()> for LocalInfileRequest {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let header = buf.get_u8();
        if header != 0xfb {
            return Err(protocol_err!("expected LOCAL INFILE request (0xfb); received 0x{:x}", header));
        }

        Ok(Self { filename: buf.get_str_eof()? })
    }
}
