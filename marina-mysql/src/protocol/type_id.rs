/// A MySQL column type id (`enum_field_types` in the C client).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeId(pub u8);

impl TypeId {
    pub const DECIMAL: TypeId = TypeId(0);
    pub const TINY: TypeId = TypeId(1);
    pub const SHORT: TypeId = TypeId(2);
    pub const LONG: TypeId = TypeId(3);
    pub const FLOAT: TypeId = TypeId(4);
    pub const DOUBLE: TypeId = TypeId(5);
    pub const NULL: TypeId = TypeId(6);
    pub const TIMESTAMP: TypeId = TypeId(7);
    pub const LONGLONG: TypeId = TypeId(8);
    pub const INT24: TypeId = TypeId(9);
    pub const DATE: TypeId = TypeId(10);
    pub const TIME: TypeId = TypeId(11);
    pub const DATETIME: TypeId = TypeId(12);
    pub const YEAR: TypeId = TypeId(13);
    pub const NEWDATE: TypeId = TypeId(14);
    pub const VARCHAR: TypeId = TypeId(15);
    pub const BIT: TypeId = TypeId(16);
    pub const JSON: TypeId = TypeId(245);
    pub const NEWDECIMAL: TypeId = TypeId(246);
    pub const ENUM: TypeId = TypeId(247);
    pub const SET: TypeId = TypeId(248);
    pub const TINY_BLOB: TypeId = TypeId(249);
    pub const MEDIUM_BLOB: TypeId = TypeId(250);
    pub const LONG_BLOB: TypeId = TypeId(251);
    pub const BLOB: TypeId = TypeId(252);
    pub const VAR_STRING: TypeId = TypeId(253);
    pub const STRING: TypeId = TypeId(254);
    pub const GEOMETRY: TypeId = TypeId(255);

    /// Fixed size in bytes of the binary-protocol encoding for this type, or
    /// `None` if the value is length-prefixed (lenenc) on the wire.
    pub fn fixed_binary_size(self) -> Option<usize> {
        Some(match self {
            Self::TINY => 1,
            Self::SHORT | Self::YEAR => 2,
            Self::LONG | Self::INT24 | Self::FLOAT => 4,
            Self::LONGLONG | Self::DOUBLE => 8,
            Self::NULL => 0,
            _ => return None,
        })
    }

    /// `true` if this is one of the temporal types with a length-prefixed block
    /// encoding (a single leading length byte, then that many bytes).
    pub fn is_length_prefixed_temporal(self) -> bool {
        matches!(self, Self::DATE | Self::TIME | Self::TIMESTAMP | Self::DATETIME)
    }
}
