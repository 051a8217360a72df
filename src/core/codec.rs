//! # Framing Layer
//!
//! Length-prefixed frames over a reliable ordered byte stream.
//!
//! ```text
//! frame   := uint32_be(length) || payload
//! payload := uint8(type) || body
//! ```
//!
//! `length` counts the payload only. Any failure here is fatal to the
//! connection: once a frame is partially read or written there is no way back to
//! a frame boundary.
//!
//! Two interfaces are provided:
//! - [`recv_frame`] / [`send_frame`] read and write exactly one frame on any
//!   `tokio::io` stream, used by the server loop and the concurrent sender.
//! - [`FrameCodec`] for `tokio_util::codec::Framed` based consumers.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::config::MAX_PAYLOAD_SIZE;
use crate::core::packet::{Packet, PacketType};
use crate::core::wire;
use crate::error::{ProtocolError, Result};

/// Size of the length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// One decoded frame: a non-empty payload whose first byte is the type tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    /// Wrap a payload. An empty payload has no type tag and is rejected.
    pub fn new(payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }
        Ok(Self { payload })
    }

    pub fn from_packet(packet: &Packet) -> Self {
        Self {
            payload: Bytes::from(packet.marshal()),
        }
    }

    /// Raw type tag
    #[inline]
    pub fn tag(&self) -> u8 {
        self.payload[0]
    }

    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_u8(self.tag())
    }

    /// Payload after the type tag
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.payload[1..]
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Value of the length prefix
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Decode the payload into a typed packet
    pub fn decode(&self) -> Result<Packet> {
        Packet::decode(self.tag(), self.body())
    }

    /// Length prefix followed by payload, as it goes on the wire
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(LENGTH_PREFIX_SIZE + self.payload.len());
        wire::put_u32(&mut out, self.payload.len() as u32);
        out.extend_from_slice(&self.payload);
        out
    }
}

fn check_length(len: usize, max_payload_size: usize) -> Result<()> {
    if len == 0 {
        return Err(ProtocolError::EmptyFrame);
    }
    if len > max_payload_size {
        return Err(ProtocolError::OversizedPacket(len));
    }
    Ok(())
}

/// Read exactly one frame.
///
/// End-of-stream before the first length byte yields
/// [`ProtocolError::ConnectionClosed`]; end-of-stream anywhere later is an I/O
/// error. The length is checked against `max_payload_size` before the payload
/// buffer is allocated.
pub async fn recv_frame<R>(reader: &mut R, max_payload_size: usize) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; LENGTH_PREFIX_SIZE];
    let mut filled = 0;
    while filled < LENGTH_PREFIX_SIZE {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Err(ProtocolError::ConnectionClosed);
            }
            return Err(ProtocolError::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        filled += n;
    }

    let len = wire::get_u32(&mut &header[..]) as usize;
    check_length(len, max_payload_size)?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    trace!(tag = payload[0], len, "recv frame");
    Frame::new(payload)
}

/// Write one frame: the length prefix, then the payload, then flush.
pub async fn send_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .map_err(|_| ProtocolError::OversizedPacket(payload.len()))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    trace!(len, "sent frame");
    Ok(())
}

/// `tokio_util` codec producing [`Frame`]s
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_payload_size: usize,
}

impl FrameCodec {
    pub fn new(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(MAX_PAYLOAD_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let len = wire::get_u32(&mut &src[..LENGTH_PREFIX_SIZE]) as usize;
        check_length(len, self.max_payload_size)?;

        let total = LENGTH_PREFIX_SIZE + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_SIZE);
        let payload = src.split_to(len).freeze();
        Frame::new(payload).map(Some)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        let len = u32::try_from(frame.len())
            .map_err(|_| ProtocolError::OversizedPacket(frame.len()))?;
        dst.reserve(LENGTH_PREFIX_SIZE + frame.len());
        dst.put_u32(len);
        dst.extend_from_slice(frame.payload());
        Ok(())
    }
}
