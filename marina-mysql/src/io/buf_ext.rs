use bytes::{Buf, BufMut, Bytes};

use crate::error::{protocol_err, Error};

/// Extension methods for reading MySQL wire-format primitives out of a `bytes::Buf`.
///
/// Mirrors the read side of the byte codec: fixed-width little-endian integers,
/// length-encoded integers/strings, NUL-terminated strings, and rest-of-packet strings.
pub trait BufExt: Buf {
    fn get_str_nul(&mut self) -> Result<String, Error>;
    fn get_bytes_nul(&mut self) -> Result<Bytes, Error>;
    fn get_str_eof(&mut self) -> Result<String, Error>;
    fn get_bytes(&mut self, n: usize) -> Result<Bytes, Error>;

    /// Length-encoded integer. Returns `None` for the NULL-marker (0xFB).
    fn get_uint_lenenc(&mut self) -> Result<Option<u64>, Error>;

    /// Length-encoded string. Returns `None` for the NULL-marker (0xFB).
    fn get_bytes_lenenc(&mut self) -> Result<Option<Bytes>, Error>;

    fn get_str_lenenc(&mut self) -> Result<Option<String>, Error>;
}

impl<T: Buf> BufExt for T {
    fn get_str_nul(&mut self) -> Result<String, Error> {
        let bytes = self.get_bytes_nul()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| protocol_err!("column contains non-UTF-8 data: {}", e))
    }

    fn get_bytes_nul(&mut self) -> Result<Bytes, Error> {
        let mut buf = Vec::new();

        loop {
            if !self.has_remaining() {
                return Err(protocol_err!("unexpected EOF while reading NUL-terminated string"));
            }

            let b = self.get_u8();
            if b == 0 {
                break;
            }

            buf.push(b);
        }

        Ok(Bytes::from(buf))
    }

    fn get_str_eof(&mut self) -> Result<String, Error> {
        let bytes = self.copy_to_bytes(self.remaining());
        String::from_utf8(bytes.to_vec())
            .map_err(|e| protocol_err!("column contains non-UTF-8 data: {}", e))
    }

    fn get_bytes(&mut self, n: usize) -> Result<Bytes, Error> {
        if self.remaining() < n {
            return Err(protocol_err!(
                "expected {} bytes, only {} remaining",
                n,
                self.remaining()
            ));
        }

        Ok(self.copy_to_bytes(n))
    }

    fn get_uint_lenenc(&mut self) -> Result<Option<u64>, Error> {
        if !self.has_remaining() {
            return Err(protocol_err!("unexpected EOF while reading length-encoded integer"));
        }

        Ok(match self.get_u8() {
            0xfb => None,
            0xfc => Some(self.get_uint_le_n(2)?),
            0xfd => Some(self.get_uint_le_n(3)?),
            0xfe => Some(self.get_uint_le_n(8)?),
            v => Some(v as u64),
        })
    }

    fn get_bytes_lenenc(&mut self) -> Result<Option<Bytes>, Error> {
        match self.get_uint_lenenc()? {
            None => Ok(None),
            Some(len) => Ok(Some(self.get_bytes(len as usize)?)),
        }
    }

    fn get_str_lenenc(&mut self) -> Result<Option<String>, Error> {
        match self.get_bytes_lenenc()? {
            None => Ok(None),
            Some(bytes) => Ok(Some(
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| protocol_err!("column contains non-UTF-8 data: {}", e))?,
            )),
        }
    }
}

trait BufIntExt: Buf {
    fn get_uint_le_n(&mut self, n: usize) -> Result<u64, Error>;
}

impl<T: Buf> BufIntExt for T {
    fn get_uint_le_n(&mut self, n: usize) -> Result<u64, Error> {
        if self.remaining() < n {
            return Err(protocol_err!("unexpected EOF while reading {}-byte integer", n));
        }

        Ok(self.get_uint_le(n))
    }
}

/// Extension methods for writing MySQL wire-format primitives into a `bytes::BufMut`.
pub trait BufMutExt: BufMut {
    fn put_str_nul(&mut self, s: &str);
    fn put_bytes_nul(&mut self, bytes: &[u8]);
    fn put_str_eof(&mut self, s: &str);
    fn put_uint_lenenc(&mut self, value: u64);
    fn put_bytes_lenenc(&mut self, bytes: &[u8]);
    fn put_str_lenenc(&mut self, s: &str);
}

impl<T: BufMut> BufMutExt for T {
    fn put_str_nul(&mut self, s: &str) {
        self.put_bytes_nul(s.as_bytes());
    }

    fn put_bytes_nul(&mut self, bytes: &[u8]) {
        self.put_slice(bytes);
        self.put_u8(0);
    }

    fn put_str_eof(&mut self, s: &str) {
        self.put_slice(s.as_bytes());
    }

    fn put_uint_lenenc(&mut self, value: u64) {
        if value < 251 {
            self.put_u8(value as u8);
        } else if value <= 0xffff {
            self.put_u8(0xfc);
            self.put_uint_le(value, 2);
        } else if value <= 0xff_ffff {
            self.put_u8(0xfd);
            self.put_uint_le(value, 3);
        } else {
            self.put_u8(0xfe);
            self.put_uint_le(value, 8);
        }
    }

    fn put_bytes_lenenc(&mut self, bytes: &[u8]) {
        self.put_uint_lenenc(bytes.len() as u64);
        self.put_slice(bytes);
    }

    fn put_str_lenenc(&mut self, s: &str) {
        self.put_bytes_lenenc(s.as_bytes());
    }
}
