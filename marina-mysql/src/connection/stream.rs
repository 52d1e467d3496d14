//! Packet framing and the optional compressed-frame wrapper (spec 4.2).
//!
//! `MySqlStream` owns the sequence-id bookkeeping the connection state
//! machine depends on (spec 4.4: "Sequence id is reset to 0 at the start
//! of every new command") and the 16 MiB fragmentation rule (spec 3,
//! testable invariant 1). Compression sits as a adaptor between the framer
//! and the socket, per Design Notes: "the framer must not know whether
//! compression is active" — from the framer's point of view it is still
//! just reading/writing a byte stream.

use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{protocol_err, Error};
use crate::io::{read_u24_le, BufStream, Decode, Encode};
use crate::net::MaybeTlsStream;
use crate::options::Compression;
use crate::protocol::Capabilities;

/// Maximum payload that fits in a single MySQL packet before the length
/// field wraps and a zero-length terminator (or a further full packet) is
/// needed.
pub(crate) const MAX_PACKET_SIZE: usize = 0xFF_FFFF;

pub(crate) struct MySqlStream {
    inner: BufStream<MaybeTlsStream>,
    pub(crate) capabilities: Capabilities,
    seq_id: u8,
    compression: Option<CompressionState>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

struct CompressionState {
    codec: Compression,
    write_seq: u8,
    read_seq: u8,
    /// Decompressed bytes not yet consumed as whole packets.
    read_buf: VecDeque<u8>,
    /// Framed (header+payload) bytes queued for the next compressed frame.
    write_buf: Vec<u8>,
}

impl MySqlStream {
    pub(crate) fn new(socket: MaybeTlsStream) -> Self {
        Self {
            inner: BufStream::new(socket),
            capabilities: Capabilities::empty(),
            seq_id: 0,
            compression: None,
            read_timeout: None,
            write_timeout: None,
        }
    }

    /// Bounds every subsequent socket read/write (spec 6's `read_timeout`/
    /// `write_timeout`); a timeout is surfaced as [`Error::Io`] and, per
    /// spec 5, treated the same as any other cancelled read/write — the
    /// connection is left unusable and the caller must close it.
    pub(crate) fn set_timeouts(&mut self, read: Option<Duration>, write: Option<Duration>) {
        self.read_timeout = read;
        self.write_timeout = write;
    }

    pub(crate) fn enable_compression(&mut self, codec: Compression) {
        self.compression = Some(CompressionState {
            codec,
            write_seq: 0,
            read_seq: 0,
            read_buf: VecDeque::new(),
            write_buf: Vec::new(),
        });
    }

    pub(crate) fn is_tls(&self) -> bool {
        self.inner.get_ref().is_tls()
    }

    /// Sets the starting sequence id, used when a `MySqlStream` is created
    /// partway through the connection phase (after a pre-TLS handshake
    /// exchange already consumed a few sequence ids).
    pub(crate) fn set_seq(&mut self, seq: u8) {
        self.seq_id = seq;
    }

    pub(crate) fn write_raw(&mut self, payload: &[u8]) {
        self.write_framed(payload);
    }

    pub(crate) async fn shutdown(&mut self) -> Result<(), Error> {
        use tokio::io::AsyncWriteExt;
        self.inner.get_mut().shutdown().await?;
        Ok(())
    }

    /// Resets the packet (and, if active, the compressed-frame) sequence
    /// id: every command phase starts a fresh sequence.
    pub(crate) fn begin_command(&mut self) {
        self.seq_id = 0;
        if let Some(c) = &mut self.compression {
            c.write_seq = 0;
            c.read_seq = 0;
        }
    }

    pub(crate) fn write_packet<'en, T>(&mut self, packet: &T)
    where
        T: Encode<'en, Capabilities>,
    {
        let mut payload = Vec::new();
        packet.encode_with(&mut payload, self.capabilities);
        self.write_framed(&payload);
    }

    pub(crate) fn write_packet_ctx<'en, T, C>(&mut self, packet: &T, ctx: C)
    where
        T: Encode<'en, C>,
    {
        let mut payload = Vec::new();
        packet.encode_with(&mut payload, ctx);
        self.write_framed(&payload);
    }

    /// Chunks `payload` into `MAX_PACKET_SIZE`-byte packets, stamping
    /// sequence ids, terminating with a short (possibly empty) packet.
    fn write_framed(&mut self, payload: &[u8]) {
        let dest: &mut Vec<u8> = match &mut self.compression {
            Some(c) => &mut c.write_buf,
            None => &mut self.inner.wbuf,
        };

        let mut chunks = payload.chunks(MAX_PACKET_SIZE).peekable();
        if chunks.peek().is_none() {
            write_header(dest, 0, self.seq_id);
            self.seq_id = self.seq_id.wrapping_add(1);
            return;
        }

        while let Some(chunk) = chunks.next() {
            write_header(dest, chunk.len(), self.seq_id);
            dest.extend_from_slice(chunk);
            self.seq_id = self.seq_id.wrapping_add(1);

            if chunk.len() == MAX_PACKET_SIZE && chunks.peek().is_none() {
                // exact multiple of MAX_PACKET_SIZE: terminate with an empty packet
                write_header(dest, 0, self.seq_id);
                self.seq_id = self.seq_id.wrapping_add(1);
            }
        }
    }

    pub(crate) async fn flush(&mut self) -> Result<(), Error> {
        if let Some(c) = &mut self.compression {
            if !c.write_buf.is_empty() {
                let raw = std::mem::take(&mut c.write_buf);
                let frame = compress_frame(&raw, c.codec, c.write_seq)?;
                c.write_seq = c.write_seq.wrapping_add(1);
                self.inner.wbuf.extend_from_slice(&frame);
            }
        }

        match self.write_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.inner.flush()).await {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::from(std::io::ErrorKind::TimedOut).into()),
            },
            None => self.inner.flush().await,
        }
    }

    /// Reads one logical (possibly fragmented) packet payload, enforcing
    /// sequence continuity.
    pub(crate) async fn recv_packet(&mut self) -> Result<Bytes, Error> {
        let mut full = BytesMut::new();

        loop {
            let header = self.read_exact(4).await?;
            let len = read_u24_le(&header[..3]) as usize;
            let seq = header[3];

            if seq != self.seq_id {
                return Err(protocol_err!(
                    "packet sequence id desync: expected {}, received {}",
                    self.seq_id,
                    seq
                ));
            }
            self.seq_id = self.seq_id.wrapping_add(1);

            let payload = self.read_exact(len).await?;
            full.extend_from_slice(&payload);

            if len < MAX_PACKET_SIZE {
                break;
            }
        }

        Ok(full.freeze())
    }

    pub(crate) async fn recv_with<'de, T, C>(&mut self, ctx: C) -> Result<T, Error>
    where
        T: Decode<'de, C>,
    {
        T::decode_with(self.recv_packet().await?, ctx)
    }

    async fn read_exact(&mut self, n: usize) -> Result<BytesMut, Error> {
        match self.read_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.read_exact_inner(n)).await {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::from(std::io::ErrorKind::TimedOut).into()),
            },
            None => self.read_exact_inner(n).await,
        }
    }

    async fn read_exact_inner(&mut self, n: usize) -> Result<BytesMut, Error> {
        if self.compression.is_some() {
            self.fill_compressed(n).await?;
            let c = self.compression.as_mut().unwrap();
            let bytes: Vec<u8> = c.read_buf.drain(..n).collect();
            return Ok(BytesMut::from(&bytes[..]));
        }

        self.inner.read_raw(n).await
    }

    /// Pulls compressed frames off the socket until at least `n` decoded
    /// bytes are buffered.
    async fn fill_compressed(&mut self, n: usize) -> Result<(), Error> {
        loop {
            let have = self.compression.as_ref().unwrap().read_buf.len();
            if have >= n {
                return Ok(());
            }

            let header = self.inner.read_raw(7).await?;
            let compressed_len = read_u24_le(&header[..3]) as usize;
            let _comp_seq = header[3];
            let uncompressed_len = read_u24_le(&header[4..7]) as usize;

            let body = self.inner.read_raw(compressed_len).await?;

            let decoded = if uncompressed_len == 0 {
                body.to_vec()
            } else {
                decompress_frame(&body, self.compression.as_ref().unwrap().codec, uncompressed_len)?
            };

            let c = self.compression.as_mut().unwrap();
            c.read_buf.extend(decoded);
            c.read_seq = c.read_seq.wrapping_add(1);
        }
    }
}

fn write_header(dest: &mut Vec<u8>, len: usize, seq: u8) {
    dest.push(len as u8);
    dest.push((len >> 8) as u8);
    dest.push((len >> 16) as u8);
    dest.push(seq);
}

/// Wraps `raw` (one or more framed MySQL packets) in the 7-byte compressed
/// header (spec 4.2). Falls back to storing the payload uncompressed
/// (`uncompressed_len = 0`) when compression doesn't shrink it, or for
/// small payloads where the header overhead isn't worth it.
fn compress_frame(raw: &[u8], codec: Compression, seq: u8) -> Result<Vec<u8>, Error> {
    let compressed = if raw.len() < 50 {
        None
    } else {
        Some(compress_bytes(raw, codec)?)
    };

    let mut out = Vec::new();
    match compressed {
        Some(c) if c.len() < raw.len() => {
            out.extend_from_slice(&(c.len() as u32).to_le_bytes()[..3]);
            out.push(seq);
            out.extend_from_slice(&(raw.len() as u32).to_le_bytes()[..3]);
            out.extend_from_slice(&c);
        }
        _ => {
            out.extend_from_slice(&(raw.len() as u32).to_le_bytes()[..3]);
            out.push(seq);
            out.extend_from_slice(&[0, 0, 0]);
            out.extend_from_slice(raw);
        }
    }

    Ok(out)
}

fn compress_bytes(raw: &[u8], codec: Compression) -> Result<Vec<u8>, Error> {
    match codec {
        Compression::None => Ok(raw.to_vec()),

        #[cfg(feature = "zlib-compression")]
        Compression::Zlib => {
            use std::io::Write;
            let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
            enc.write_all(raw)?;
            Ok(enc.finish()?)
        }
        #[cfg(not(feature = "zlib-compression"))]
        Compression::Zlib => Err(protocol_err!("zlib compression requested but the `zlib-compression` feature is disabled")),

        #[cfg(feature = "zstd-compression")]
        Compression::Zstd => zstd::stream::encode_all(raw, 0).map_err(Error::Io),
        #[cfg(not(feature = "zstd-compression"))]
        Compression::Zstd => Err(protocol_err!("zstd compression requested but the `zstd-compression` feature is disabled")),
    }
}

fn decompress_frame(body: &[u8], codec: Compression, uncompressed_len: usize) -> Result<Vec<u8>, Error> {
    let out = match codec {
        Compression::None => body.to_vec(),

        #[cfg(feature = "zlib-compression")]
        Compression::Zlib => {
            use std::io::Read;
            let mut dec = flate2::read::ZlibDecoder::new(body);
            let mut out = Vec::with_capacity(uncompressed_len);
            dec.read_to_end(&mut out)?;
            out
        }
        #[cfg(not(feature = "zlib-compression"))]
        Compression::Zlib => return Err(protocol_err!("received a zlib-compressed frame but the `zlib-compression` feature is disabled")),

        #[cfg(feature = "zstd-compression")]
        Compression::Zstd => zstd::stream::decode_all(body).map_err(Error::Io)?,
        #[cfg(not(feature = "zstd-compression"))]
        Compression::Zstd => return Err(protocol_err!("received a zstd-compressed frame but the `zstd-compression` feature is disabled")),
    };

    if out.len() != uncompressed_len {
        return Err(protocol_err!(
            "decompressed frame length mismatch: header says {}, got {}",
            uncompressed_len,
            out.len()
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_header_encodes_u24_le_length() {
        let mut buf = Vec::new();
        write_header(&mut buf, 0x01_02_03, 7);
        assert_eq!(buf, vec![0x03, 0x02, 0x01, 7]);
    }

    #[test]
    fn compress_frame_falls_back_to_uncompressed_for_small_payloads() {
        let frame = compress_frame(b"short", Compression::None, 0).unwrap();
        // header: compressed_len=5, seq=0, uncompressed_len=0 (stored uncompressed)
        assert_eq!(&frame[..7], &[5, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&frame[7..], b"short");
    }
}
