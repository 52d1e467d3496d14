use bytes::Bytes;

use crate::error::Error;
use crate::io::{BufExt, Decode};

/// The lenenc column count that begins the response to a query producing a
/// result set (spec 4.4, `Command` state's "any other" branch).
#[derive(Debug, Clone, Copy)]
pub struct ColumnCount {
    pub columns: u64,
}

impl<'de> Decode<'de, ()> for ColumnCount {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let columns = buf.get_uint_lenenc()?.unwrap_or(0);
        Ok(Self { columns })
    }
}
