use crate::io::{BufMutExt, Encode};

/// `COM_STMT_FETCH`: fetch the next `rows` rows from a cursor opened by a
/// prior `COM_STMT_EXECUTE` whose result carried
/// `SERVER_STATUS_CURSOR_EXISTS` (spec 4.4, Open Question 1).
#[derive(Debug)]
pub struct ComStmtFetch {
    pub statement_id: u32,
    pub rows: u32,
}

impl<'en> Encode<'en> for ComStmtFetch {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.put_u8(0x1c);
        buf.put_u32_le(self.statement_id);
        buf.put_u32_le(self.rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_com_stmt_fetch() {
        let mut buf = Vec::new();
        ComStmtFetch { statement_id: 1, rows: 10 }.encode(&mut buf);
        assert_eq!(&buf[..], b"\x1c\x01\0\0\0\x0a\0\0\0");
    }
}
