//! The decoded form of a single result-set cell (spec Design Notes,
//! "Dynamic value types"): a tagged variant replacing the source's untyped
//! dynamic row values, with decoders keyed by column type id (spec 4.5/4.8).

use atoi::{atoi, FromRadix10SignedChecked};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::charset;
use crate::error::{protocol_err, Error};
use crate::protocol::{ColumnDef, TypeId};

/// A decoded row cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Decoded as a string rather than a parsed number: `DECIMAL`/`NEWDECIMAL`
    /// columns can exceed the range of any fixed-width float without losing
    /// precision, so marina hands the textual representation to the caller
    /// (matching the teacher's own `bigdecimal`/`rust_decimal` integration
    /// points, which parse this same string).
    Decimal(String),
    Bytes(Vec<u8>),
    Str(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Json(Box<str>),
}

impl Value {
    /// The `(type_id, is_unsigned)` pair sent in a `COM_STMT_EXECUTE`
    /// parameter-type array for this value (spec 4.6).
    pub(crate) fn binary_type_id(&self) -> (TypeId, bool) {
        match self {
            Value::Null => (TypeId::NULL, false),
            Value::Int(_) => (TypeId::LONGLONG, false),
            Value::UInt(_) => (TypeId::LONGLONG, true),
            Value::Float(_) => (TypeId::DOUBLE, false),
            Value::Decimal(_) => (TypeId::NEWDECIMAL, false),
            Value::Bytes(_) => (TypeId::LONG_BLOB, false),
            Value::Str(_) => (TypeId::VAR_STRING, false),
            Value::Date(_) => (TypeId::DATE, false),
            Value::Time(_) => (TypeId::TIME, false),
            Value::DateTime(_) => (TypeId::DATETIME, false),
            Value::Json(_) => (TypeId::JSON, false),
        }
    }

    /// Append this value's binary-protocol encoding to `buf`. Callers must
    /// have already marked `Value::Null` parameters in the null bitmap and
    /// must not call this for them (spec 4.6).
    pub(crate) fn encode_binary(&self, buf: &mut Vec<u8>) {
        match self {
            Value::Null => {}
            Value::Int(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::UInt(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::Float(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::Decimal(s) => encode_lenenc_bytes(buf, s.as_bytes()),
            Value::Bytes(b) => encode_lenenc_bytes(buf, b),
            Value::Str(s) => encode_lenenc_bytes(buf, s.as_bytes()),
            Value::Json(s) => encode_lenenc_bytes(buf, s.as_bytes()),
            Value::Date(d) => encode_binary_date(buf, *d),
            Value::Time(t) => encode_binary_time(buf, *t),
            Value::DateTime(dt) => encode_binary_datetime(buf, *dt),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Decode the text-protocol representation (a lenenc string, already
    /// stripped of its NULL marker by the row decoder) according to the
    /// column's declared type.
    pub(crate) fn decode_text(column: &ColumnDef, raw: &[u8]) -> Result<Self, Error> {
        use TypeId as T;

        Ok(match column.type_id {
            T::TINY | T::SHORT | T::LONG | T::INT24 | T::YEAR => {
                if column.is_unsigned() {
                    Value::UInt(parse_int::<u64>(raw)?)
                } else {
                    Value::Int(parse_int::<i64>(raw)?)
                }
            }
            T::LONGLONG => {
                if column.is_unsigned() {
                    Value::UInt(parse_int::<u64>(raw)?)
                } else {
                    Value::Int(parse_int::<i64>(raw)?)
                }
            }
            T::FLOAT | T::DOUBLE => Value::Float(parse_float(raw)?),
            T::DECIMAL | T::NEWDECIMAL => Value::Decimal(text(raw)?),
            T::DATE => Value::Date(parse_date(raw)?),
            T::TIME => Value::Time(parse_time(raw)?),
            T::TIMESTAMP | T::DATETIME => Value::DateTime(parse_datetime(raw)?),
            T::JSON => Value::Json(text(raw)?.into_boxed_str()),
            T::TINY_BLOB | T::MEDIUM_BLOB | T::LONG_BLOB | T::BLOB if column.is_binary() => {
                Value::Bytes(raw.to_vec())
            }
            _ if column.is_binary() => Value::Bytes(raw.to_vec()),
            _ => Value::Str(charset::decode_str(column.charset, raw)),
        })
    }

    /// Decode a binary-protocol value for one non-NULL column (spec 4.5:
    /// "binary row"). `raw` is the remaining row payload starting at this
    /// column's value; returns the decoded value plus the number of bytes it
    /// consumed.
    pub(crate) fn decode_binary(column: &ColumnDef, raw: &[u8]) -> Result<(Self, usize), Error> {
        use TypeId as T;

        Ok(match column.type_id {
            T::TINY => {
                let v = *raw.first().ok_or_else(too_short)?;
                (
                    if column.is_unsigned() { Value::UInt(v as u64) } else { Value::Int(v as i8 as i64) },
                    1,
                )
            }
            T::SHORT | T::YEAR => {
                let v = read_u16(raw)?;
                (
                    if column.is_unsigned() { Value::UInt(v as u64) } else { Value::Int(v as i16 as i64) },
                    2,
                )
            }
            T::LONG | T::INT24 => {
                let v = read_u32(raw)?;
                (
                    if column.is_unsigned() { Value::UInt(v as u64) } else { Value::Int(v as i32 as i64) },
                    4,
                )
            }
            T::LONGLONG => {
                let v = read_u64(raw)?;
                (if column.is_unsigned() { Value::UInt(v) } else { Value::Int(v as i64) }, 8)
            }
            T::FLOAT => (Value::Float(read_f32(raw)? as f64), 4),
            T::DOUBLE => (Value::Float(read_f64(raw)?), 8),
            T::NULL => (Value::Null, 0),
            T::DATE => decode_binary_date(raw)?,
            T::TIME => decode_binary_time(raw)?,
            T::TIMESTAMP | T::DATETIME => decode_binary_datetime(raw)?,
            T::DECIMAL | T::NEWDECIMAL => {
                let (s, n) = read_lenenc_bytes(raw)?;
                (Value::Decimal(text(s)?), n)
            }
            T::JSON => {
                let (s, n) = read_lenenc_bytes(raw)?;
                (Value::Json(text(s)?.into_boxed_str()), n)
            }
            _ => {
                // VARCHAR/VAR_STRING/STRING/BLOB family and anything else:
                // lenenc bytes, decoded as text unless the column is binary.
                let (bytes, n) = read_lenenc_bytes(raw)?;
                let value = if column.is_binary() {
                    Value::Bytes(bytes.to_vec())
                } else {
                    Value::Str(charset::decode_str(column.charset, bytes))
                };
                (value, n)
            }
        })
    }
}

fn too_short() -> Error {
    protocol_err!("row payload truncated while decoding a binary-protocol value")
}

fn read_u16(raw: &[u8]) -> Result<u16, Error> {
    raw.get(..2).map(|b| u16::from_le_bytes([b[0], b[1]])).ok_or_else(too_short)
}

fn read_u32(raw: &[u8]) -> Result<u32, Error> {
    raw.get(..4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(too_short)
}

fn read_u64(raw: &[u8]) -> Result<u64, Error> {
    raw.get(..8)
        .map(|b| u64::from_le_bytes(b.try_into().unwrap()))
        .ok_or_else(too_short)
}

fn read_f32(raw: &[u8]) -> Result<f32, Error> {
    raw.get(..4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(too_short)
}

fn read_f64(raw: &[u8]) -> Result<f64, Error> {
    raw.get(..8)
        .map(|b| f64::from_le_bytes(b.try_into().unwrap()))
        .ok_or_else(too_short)
}

/// Reads a lenenc-prefixed byte string and returns it along with the total
/// number of bytes (prefix + payload) consumed.
fn read_lenenc_bytes(raw: &[u8]) -> Result<(&[u8], usize), Error> {
    let (len, prefix_len) = match *raw.first().ok_or_else(too_short)? {
        b @ 0..=0xfa => (b as u64, 1),
        0xfc => (read_u16(&raw[1..])? as u64, 3),
        0xfd => {
            let b = raw.get(1..4).ok_or_else(too_short)?;
            (u32::from_le_bytes([b[0], b[1], b[2], 0]) as u64, 4)
        }
        0xfe => (read_u64(&raw[1..])?, 9),
        0xfb => return Err(protocol_err!("unexpected NULL marker in a non-NULL binary value")),
        _ => unreachable!(),
    };

    let total = prefix_len + len as usize;
    let bytes = raw.get(prefix_len..total).ok_or_else(too_short)?;
    Ok((bytes, total))
}

/// `DATE`/`DATETIME`/`TIMESTAMP` binary values are a length-prefixed block:
/// a single length byte (0, 4, 7, or 11) followed by that many bytes of
/// year/month/day/[hour/min/sec/[microsecond]].
struct BinaryTemporal {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    micros: u32,
}

fn read_binary_temporal(raw: &[u8]) -> Result<(BinaryTemporal, usize), Error> {
    let len = *raw.first().ok_or_else(too_short)? as usize;
    let body = raw.get(1..1 + len).ok_or_else(too_short)?;

    let mut t = BinaryTemporal { year: 0, month: 0, day: 0, hour: 0, minute: 0, second: 0, micros: 0 };

    if len >= 4 {
        t.year = read_u16(body)?;
        t.month = body[2];
        t.day = body[3];
    }
    if len >= 7 {
        t.hour = body[4];
        t.minute = body[5];
        t.second = body[6];
    }
    if len >= 11 {
        t.micros = read_u32(&body[7..])?;
    }

    Ok((t, 1 + len))
}

fn decode_binary_date(raw: &[u8]) -> Result<(Value, usize), Error> {
    let (t, n) = read_binary_temporal(raw)?;
    let date = NaiveDate::from_ymd_opt(t.year as i32, t.month.max(1) as u32, t.day.max(1) as u32)
        .ok_or_else(|| protocol_err!("invalid DATE value in binary row"))?;
    Ok((Value::Date(date), n))
}

fn decode_binary_datetime(raw: &[u8]) -> Result<(Value, usize), Error> {
    let (t, n) = read_binary_temporal(raw)?;
    let date = NaiveDate::from_ymd_opt(t.year as i32, t.month.max(1) as u32, t.day.max(1) as u32)
        .ok_or_else(|| protocol_err!("invalid DATETIME value in binary row"))?;
    let time = NaiveTime::from_hms_micro_opt(t.hour as u32, t.minute as u32, t.second as u32, t.micros)
        .ok_or_else(|| protocol_err!("invalid DATETIME value in binary row"))?;
    Ok((Value::DateTime(date.and_time(time)), n))
}

fn decode_binary_time(raw: &[u8]) -> Result<(Value, usize), Error> {
    let len = *raw.first().ok_or_else(too_short)? as usize;
    let body = raw.get(1..1 + len).ok_or_else(too_short)?;

    let mut hour = 0u32;
    let mut minute = 0u32;
    let mut second = 0u32;
    let mut micros = 0u32;

    if len >= 8 {
        // byte 0 is the sign (1 = negative), bytes 1..5 are days; marina
        // folds days into hours since chrono's NaiveTime has no day field.
        let negative = body[0] != 0;
        let days = read_u32(&body[1..5])?;
        hour = days * 24 + body[5] as u32;
        minute = body[6] as u32;
        second = body[7] as u32;

        if negative {
            return Err(protocol_err!("negative TIME values are not representable"));
        }
    }
    if len >= 12 {
        micros = read_u32(&body[8..])?;
    }

    let time = NaiveTime::from_hms_micro_opt(hour % 24, minute, second, micros)
        .ok_or_else(|| protocol_err!("invalid TIME value in binary row"))?;

    Ok((Value::Time(time), 1 + len))
}

fn encode_lenenc_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    let len = bytes.len() as u64;
    if len < 251 {
        buf.push(len as u8);
    } else if len <= 0xffff {
        buf.push(0xfc);
        buf.extend_from_slice(&(len as u16).to_le_bytes());
    } else if len <= 0xff_ffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(len as u32).to_le_bytes()[..3]);
    } else {
        buf.push(0xfe);
        buf.extend_from_slice(&len.to_le_bytes());
    }
    buf.extend_from_slice(bytes);
}

fn encode_binary_date(buf: &mut Vec<u8>, date: NaiveDate) {
    use chrono::Datelike;
    buf.push(4);
    buf.extend_from_slice(&(date.year() as u16).to_le_bytes());
    buf.push(date.month() as u8);
    buf.push(date.day() as u8);
}

fn encode_binary_time(buf: &mut Vec<u8>, time: NaiveTime) {
    use chrono::Timelike;
    let micros = time.nanosecond() / 1_000;

    if micros == 0 {
        buf.push(8);
    } else {
        buf.push(12);
    }
    buf.push(0); // sign (never negative; marina's Value::Time has no day component)
    buf.extend_from_slice(&0u32.to_le_bytes()); // days
    buf.push(time.hour() as u8);
    buf.push(time.minute() as u8);
    buf.push(time.second() as u8);

    if micros != 0 {
        buf.extend_from_slice(&micros.to_le_bytes());
    }
}

fn encode_binary_datetime(buf: &mut Vec<u8>, dt: NaiveDateTime) {
    use chrono::{Datelike, Timelike};
    let micros = dt.nanosecond() / 1_000;

    buf.push(if micros == 0 { 7 } else { 11 });
    buf.extend_from_slice(&(dt.year() as u16).to_le_bytes());
    buf.push(dt.month() as u8);
    buf.push(dt.day() as u8);
    buf.push(dt.hour() as u8);
    buf.push(dt.minute() as u8);
    buf.push(dt.second() as u8);

    if micros != 0 {
        buf.extend_from_slice(&micros.to_le_bytes());
    }
}

fn text(raw: &[u8]) -> Result<String, Error> {
    String::from_utf8(raw.to_vec()).map_err(|e| protocol_err!("column contains non-UTF-8 data: {}", e))
}

fn parse_int<T: FromRadix10SignedChecked>(raw: &[u8]) -> Result<T, Error> {
    atoi::<T>(raw)
        .ok_or_else(|| protocol_err!("invalid integer in text-protocol row: {:?}", String::from_utf8_lossy(raw)))
}

fn parse_float(raw: &[u8]) -> Result<f64, Error> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| protocol_err!("invalid float in text-protocol row: {:?}", String::from_utf8_lossy(raw)))
}

fn parse_date(raw: &[u8]) -> Result<NaiveDate, Error> {
    let s = std::str::from_utf8(raw).map_err(|_| protocol_err!("invalid DATE text"))?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| protocol_err!("invalid DATE {:?}: {}", s, e))
}

fn parse_time(raw: &[u8]) -> Result<NaiveTime, Error> {
    let s = std::str::from_utf8(raw).map_err(|_| protocol_err!("invalid TIME text"))?;
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| protocol_err!("invalid TIME {:?}: {}", s, e))
}

fn parse_datetime(raw: &[u8]) -> Result<NaiveDateTime, Error> {
    let s = std::str::from_utf8(raw).map_err(|_| protocol_err!("invalid DATETIME text"))?;
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| protocol_err!("invalid DATETIME {:?}: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FieldFlags;

    fn col(type_id: TypeId, unsigned: bool, binary: bool) -> ColumnDef {
        ColumnDef {
            schema: String::new(),
            table_alias: String::new(),
            table: String::new(),
            name: "c".into(),
            org_name: "c".into(),
            charset: if binary { 63 } else { 45 },
            column_length: 0,
            type_id,
            flags: if unsigned { FieldFlags::UNSIGNED } else { FieldFlags::empty() },
            decimals: 0,
        }
    }

    #[test]
    fn decodes_text_integer() {
        let c = col(TypeId::LONG, false, false);
        let v = Value::decode_text(&c, b"42").unwrap();
        assert_eq!(v, Value::Int(42));
    }

    #[test]
    fn decodes_text_unsigned() {
        let c = col(TypeId::LONGLONG, true, false);
        let v = Value::decode_text(&c, b"18446744073709551615").unwrap();
        assert_eq!(v, Value::UInt(u64::MAX));
    }

    #[test]
    fn decodes_text_string() {
        let c = col(TypeId::VAR_STRING, false, false);
        let v = Value::decode_text(&c, "héllo".as_bytes()).unwrap();
        assert_eq!(v, Value::Str("héllo".to_string()));
    }

    #[test]
    fn decodes_binary_tiny() {
        let c = col(TypeId::TINY, false, false);
        let (v, n) = Value::decode_binary(&c, &[5, 0xff]).unwrap();
        assert_eq!(v, Value::Int(5));
        assert_eq!(n, 1);
    }

    #[test]
    fn decodes_binary_long_unsigned() {
        let c = col(TypeId::LONG, true, false);
        let (v, n) = Value::decode_binary(&c, &300u32.to_le_bytes()).unwrap();
        assert_eq!(v, Value::UInt(300));
        assert_eq!(n, 4);
    }

    #[test]
    fn decodes_binary_lenenc_string() {
        let c = col(TypeId::VAR_STRING, false, false);
        let mut raw = vec![5u8];
        raw.extend_from_slice(b"hello");
        raw.push(0xaa);

        let (v, n) = Value::decode_binary(&c, &raw).unwrap();
        assert_eq!(v, Value::Str("hello".into()));
        assert_eq!(n, 6);
    }

    #[test]
    fn decodes_binary_date() {
        let c = col(TypeId::DATE, false, false);
        let raw = [4u8, 0xe7, 0x07, 1, 15]; // 2023-01-15
        let (v, n) = Value::decode_binary(&c, &raw).unwrap();
        assert_eq!(v, Value::Date(NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()));
        assert_eq!(n, 5);
    }
}
