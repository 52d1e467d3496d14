use bytes::Bytes;

use crate::error::{protocol_err, Error};
use crate::io::{BufExt, BufMutExt, Decode, Encode};
use crate::protocol::field::FieldFlags;
use crate::protocol::type_id::TypeId;

/// `ColumnDefinition41`: describes one column of a result set (spec 4.5).
///
/// Lifetime is the current result set; the connection hands out a fresh
/// `Vec<ColumnDef>` for every `COM_QUERY`/`COM_STMT_EXECUTE`.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub schema: String,
    pub table_alias: String,
    pub table: String,
    pub name: String,
    pub org_name: String,
    pub charset: u16,
    pub column_length: u32,
    pub type_id: TypeId,
    pub flags: FieldFlags,
    pub decimals: u8,
}

impl ColumnDef {
    pub fn not_null(&self) -> bool {
        self.flags.contains(FieldFlags::NOT_NULL)
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(FieldFlags::UNSIGNED)
    }

    pub fn is_binary(&self) -> bool {
        // collation id 63 is "binary"
        self.charset == 63
    }
}

impl<'de> Decode<'de, ()> for ColumnDef {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let catalog = buf.get_str_lenenc()?;
        if catalog.as_deref() != Some("def") {
            return Err(protocol_err!("expected ColumnDefinition catalog \"def\"; received {:?}", catalog));
        }

        let schema = buf.get_str_lenenc()?.unwrap_or_default();
        let table_alias = buf.get_str_lenenc()?.unwrap_or_default();
        let table = buf.get_str_lenenc()?.unwrap_or_default();
        let column_alias = buf.get_str_lenenc()?.unwrap_or_default();
        let org_name = buf.get_str_lenenc()?.unwrap_or_default();

        let next_length = buf.get_uint_lenenc()?.unwrap_or(0);
        if next_length != 0x0c {
            return Err(protocol_err!("expected ColumnDefinition fixed-length field (0x0c); received {}", next_length));
        }

        let charset = buf.get_u16_le();
        let column_length = buf.get_u32_le();
        let type_id = TypeId(buf.get_u8());
        let flags = FieldFlags::from_bits_truncate(buf.get_u16_le());
        let decimals = buf.get_u8();

        Ok(Self {
            schema,
            table_alias,
            table,
            name: column_alias,
            org_name,
            charset,
            column_length,
            type_id,
            flags,
            decimals,
        })
    }
}

impl<'en> Encode<'en> for ColumnDef {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.put_str_lenenc("def");
        buf.put_str_lenenc(&self.schema);
        buf.put_str_lenenc(&self.table_alias);
        buf.put_str_lenenc(&self.table);
        buf.put_str_lenenc(&self.name);
        buf.put_str_lenenc(&self.org_name);
        buf.put_uint_lenenc(0x0c);
        buf.put_u16_le(self.charset);
        buf.put_u32_le(self.column_length);
        buf.put_u8(self.type_id.0);
        buf.put_u16_le(self.flags.bits());
        buf.put_u8(self.decimals);
        buf.extend_from_slice(&[0u8; 2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ColumnDef {
        ColumnDef {
            schema: "test".into(),
            table_alias: "t".into(),
            table: "t".into(),
            name: "a".into(),
            org_name: "a".into(),
            charset: 45,
            column_length: 11,
            type_id: TypeId::LONG,
            flags: FieldFlags::NOT_NULL,
            decimals: 0,
        }
    }

    #[test]
    fn round_trips_through_encode_decode() {
        let def = sample();
        let mut buf = Vec::new();
        def.encode_with(&mut buf, ());

        let decoded = ColumnDef::decode_with(Bytes::from(buf), ()).unwrap();
        assert_eq!(decoded.name, "a");
        assert_eq!(decoded.type_id, TypeId::LONG);
        assert_eq!(decoded.flags, FieldFlags::NOT_NULL);
        assert!(decoded.not_null());
        assert!(!decoded.is_unsigned());
    }
}
