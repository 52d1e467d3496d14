use bytes::Bytes;

use crate::error::Error;

/// Decode a packet payload into a typed value, given some context `C`
/// (typically the negotiated `Capabilities`, or `()` when none is needed).
///
/// Mirrors the teacher's `Decode<'de, C>` trait: parameterizing over context
/// lets one packet type (e.g. a row) decode differently depending on
/// capabilities negotiated earlier in the same connection.
pub trait Decode<'de, C = ()>: Sized {
    fn decode_with(buf: Bytes, context: C) -> Result<Self, Error>;
}

impl<'de> Decode<'de, ()> for Bytes {
    fn decode_with(buf: Bytes, _: ()) -> Result<Self, Error> {
        Ok(buf)
    }
}
