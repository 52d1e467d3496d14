use crate::io::{BufMutExt, Encode};
use crate::value::Value;

/// `COM_STMT_EXECUTE`: run a prepared statement, sending parameter values
/// in the binary protocol (spec 4.6).
///
/// marina always sets `new_params_bound_flag`, re-describing parameter
/// types on every execution; this is simpler than the optional
/// type-caching the protocol allows and costs two bytes per parameter.
#[derive(Debug)]
pub struct ComStmtExecute<'a> {
    pub statement_id: u32,
    pub params: &'a [Value],
}

impl<'en> Encode<'en> for ComStmtExecute<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.put_u8(0x17);
        buf.put_u32_le(self.statement_id);

        // cursor flags: NO_CURSOR
        buf.put_u8(0);

        // iteration count, always 1
        buf.put_u32_le(1);

        if self.params.is_empty() {
            return;
        }

        let null_bitmap_len = (self.params.len() + 7) / 8;
        let mut null_bitmap = vec![0u8; null_bitmap_len];
        for (i, param) in self.params.iter().enumerate() {
            if param.is_null() {
                null_bitmap[i / 8] |= 1 << (i % 8);
            }
        }
        buf.extend_from_slice(&null_bitmap);

        // new_params_bound_flag
        buf.put_u8(1);

        for param in self.params {
            let (type_id, unsigned) = param.binary_type_id();
            buf.put_u8(type_id.0);
            buf.put_u8(if unsigned { 0x80 } else { 0 });
        }

        for param in self.params {
            if !param.is_null() {
                param.encode_binary(buf);
            }
        }
    }
}
