use std::ops::{Deref, DerefMut};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Error;
use crate::io::decode::Decode;
use crate::io::encode::Encode;

/// Buffers reads and writes around an async duplex stream.
///
/// Writes accumulate in `wbuf` until [`flush`](BufStream::flush) pushes them to the
/// socket; reads pull through a `BytesMut` scratch buffer so short reads from the
/// kernel don't force a syscall per protocol field.
pub struct BufStream<S> {
    pub(crate) stream: S,
    pub(crate) wbuf: Vec<u8>,
    rbuf: BytesMut,
}

impl<S> BufStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            wbuf: Vec::with_capacity(512),
            rbuf: BytesMut::with_capacity(4096),
        }
    }

    pub fn write<'en, T>(&mut self, value: &T)
    where
        T: Encode<'en, ()>,
    {
        self.write_with(value, ())
    }

    pub fn write_with<'en, T, C>(&mut self, value: &T, context: C)
    where
        T: Encode<'en, C>,
    {
        value.encode_with(&mut self.wbuf, context);
    }

    pub async fn flush(&mut self) -> Result<(), Error> {
        self.stream.write_all(&self.wbuf).await?;
        self.stream.flush().await?;
        self.wbuf.clear();
        Ok(())
    }

    pub async fn read<'de, T>(&mut self, cnt: usize) -> Result<T, Error>
    where
        T: Decode<'de, ()>,
    {
        self.read_with(cnt, ()).await
    }

    pub async fn read_with<'de, T, C>(&mut self, cnt: usize, context: C) -> Result<T, Error>
    where
        T: Decode<'de, C>,
    {
        T::decode_with(self.read_raw(cnt).await?.freeze(), context)
    }

    pub async fn read_raw(&mut self, cnt: usize) -> Result<BytesMut, Error> {
        while self.rbuf.len() < cnt {
            let mut chunk = [0u8; 4096];
            let n = self.stream.read(&mut chunk).await?;

            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }

            self.rbuf.extend_from_slice(&chunk[..n]);
        }

        Ok(self.rbuf.split_to(cnt))
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub(crate) fn into_inner(self) -> S {
        self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}

impl<S> Deref for BufStream<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.stream
    }
}

impl<S> DerefMut for BufStream<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.stream
    }
}

/// Truncate-then-`get_u32_le` helper used when backpatching a packet header
/// after its payload length becomes known.
pub(crate) fn patch_u24_le(buf: &mut [u8], value: u32) {
    buf[0] = value as u8;
    buf[1] = (value >> 8) as u8;
    buf[2] = (value >> 16) as u8;
}

pub(crate) fn read_u24_le(buf: &[u8]) -> u32 {
    (buf[0] as u32) | (buf[1] as u32) << 8 | (buf[2] as u32) << 16
}

#[allow(dead_code)]
pub(crate) fn discard<B: Buf>(buf: &mut B, n: usize) {
    buf.advance(n);
}
