use bytes::Bytes;

use crate::error::{protocol_err, Error};
use crate::io::BufExt;
use crate::protocol::ColumnDef;
use crate::value::Value;

/// Decode one text-protocol row (spec 4.5): a lenenc string per column, or
/// `0xFB` for NULL.
pub fn decode_text_row(mut buf: Bytes, columns: &[ColumnDef]) -> Result<Vec<Value>, Error> {
    let mut values = Vec::with_capacity(columns.len());

    for column in columns {
        match buf.get_bytes_lenenc()? {
            None => values.push(Value::Null),
            Some(raw) => values.push(Value::decode_text(column, &raw)?),
        }
    }

    Ok(values)
}

/// Decode one binary-protocol row (spec 4.5): a `0x00` header, a null
/// bitmap offset by 2 bits, then fixed-width/lenenc values in column order.
pub fn decode_binary_row(mut buf: Bytes, columns: &[ColumnDef]) -> Result<Vec<Value>, Error> {
    let header = buf.get_u8_checked()?;
    if header != 0x00 {
        return Err(protocol_err!("expected binary ROW header (0x00); received 0x{:x}", header));
    }

    let null_bitmap_len = (columns.len() + 2 + 7) / 8;
    let null_bitmap = buf.get_bytes(null_bitmap_len)?;

    let raw = buf.get_remaining();
    let mut offset = 0usize;
    let mut values = Vec::with_capacity(columns.len());

    for (i, column) in columns.iter().enumerate() {
        // null bitmap is offset by 2 bits (the first 2 bits are reserved)
        let bit = i + 2;
        let is_null = null_bitmap[bit / 8] & (1 << (bit % 8)) != 0;

        if is_null {
            values.push(Value::Null);
            continue;
        }

        let (value, consumed) = Value::decode_binary(column, &raw[offset..])?;
        offset += consumed;
        values.push(value);
    }

    Ok(values)
}

trait BufExtRow {
    fn get_u8_checked(&mut self) -> Result<u8, Error>;
    fn get_remaining(&self) -> &[u8];
}

impl BufExtRow for Bytes {
    fn get_u8_checked(&mut self) -> Result<u8, Error> {
        use bytes::Buf;
        if !self.has_remaining() {
            return Err(protocol_err!("unexpected EOF while reading binary row header"));
        }
        Ok(self.get_u8())
    }

    fn get_remaining(&self) -> &[u8] {
        &self[..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FieldFlags, TypeId};

    fn int_column() -> ColumnDef {
        ColumnDef {
            schema: String::new(),
            table_alias: String::new(),
            table: String::new(),
            name: "a".into(),
            org_name: "a".into(),
            charset: 45,
            column_length: 11,
            type_id: TypeId::LONG,
            flags: FieldFlags::empty(),
            decimals: 0,
        }
    }

    #[test]
    fn decodes_text_row_with_null() {
        let columns = vec![int_column(), int_column()];
        let mut raw = vec![1u8, b'5'];
        raw.push(0xfb); // NULL

        let row = decode_text_row(Bytes::from(raw), &columns).unwrap();
        assert_eq!(row[0], Value::Int(5));
        assert_eq!(row[1], Value::Null);
    }

    #[test]
    fn decodes_binary_row_with_null_bitmap() {
        let columns = vec![int_column(), int_column()];

        // header, null bitmap (1 byte: column 1 is NULL -> bit index 3 set), value for column 0
        let mut raw = vec![0x00u8];
        raw.push(0b0000_1000);
        raw.extend_from_slice(&42i32.to_le_bytes());

        let row = decode_binary_row(Bytes::from(raw), &columns).unwrap();
        assert_eq!(row[0], Value::Int(42));
        assert_eq!(row[1], Value::Null);
    }
}
