//! Frame encoding and decoding.

use bytes::{BufMut, Bytes, BytesMut};
use zerocopy::IntoBytes;

use crate::{Event, FrameHeader, ProtocolError, Result};

/// One protocol message.
///
/// A `Frame` is always valid: `Auth` and `Lock` frames hold a payload of
/// 1..=255 bytes and every other event holds none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    event: Event,
    payload: Option<Bytes>,
}

impl Frame {
    /// Maximum payload size, bounded by the one-byte length field.
    pub const MAX_PAYLOAD: usize = u8::MAX as usize;

    /// Build a frame, validating the payload for payload-bearing events.
    ///
    /// Events without payload ignore `payload`.
    pub fn new(event: Event, payload: impl Into<Bytes>) -> Result<Self> {
        if !event.carries_payload() {
            return Ok(Self::control(event));
        }

        let payload = payload.into();
        if payload.is_empty() {
            return Err(ProtocolError::EmptyPayload { event });
        }
        if payload.len() > Self::MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge { event, size: payload.len() });
        }

        Ok(Self { event, payload: Some(payload) })
    }

    /// Build a frame without payload.
    ///
    /// Payload-bearing events are not control frames; passing `Auth` or `Lock`
    /// here yields a frame that [`Frame::encode`] writes with a zero length,
    /// which peers reject. Use [`Frame::new`] for those.
    pub fn control(event: Event) -> Self {
        Self { event, payload: None }
    }

    /// Event tag.
    pub fn event(&self) -> Event {
        self.event
    }

    /// Payload, present only on `Auth` and `Lock` frames.
    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// Split into event and payload.
    pub fn into_parts(self) -> (Event, Option<Bytes>) {
        (self.event, self.payload)
    }

    /// Total encoded size.
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.payload.as_ref().map_or(0, Bytes::len)
    }

    /// Append the wire encoding to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        let length = self.payload.as_ref().map_or(0, |p| p.len() as u8);
        let header = FrameHeader::new(self.event, length);

        dst.reserve(self.encoded_len());
        dst.put_slice(header.as_bytes());
        if let Some(payload) = &self.payload {
            dst.put_slice(payload);
        }
    }

    /// Wire encoding as a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decode one complete frame.
    ///
    /// Byte 0 must be a known event tag and the full 2-byte header must be
    /// present. For `Auth` and `Lock` the length byte must be non-zero and
    /// equal to the number of bytes after the header. Other events ignore the
    /// length byte and anything after the header.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(&tag) = bytes.first() else {
            return Err(ProtocolError::Truncated { len: 0 });
        };
        let event = Event::try_from(tag)?;
        let header = FrameHeader::from_bytes(bytes)?;

        if !event.carries_payload() {
            return Ok(Self::control(event));
        }

        let body = &bytes[FrameHeader::SIZE..];
        let declared = header.length();
        if declared == 0 || usize::from(declared) != body.len() {
            return Err(ProtocolError::MalformedPacket { event, declared, actual: body.len() });
        }

        Ok(Self { event, payload: Some(Bytes::copy_from_slice(body)) })
    }
}

/// Encode `event` with an optional payload.
///
/// `Auth` and `Lock` require a payload of 1..=255 bytes; other events ignore
/// it.
pub fn encode(event: Event, payload: Option<&[u8]>) -> Result<Bytes> {
    let payload = Bytes::copy_from_slice(payload.unwrap_or_default());
    Frame::new(event, payload).map(|frame| frame.to_bytes())
}

/// Decode a complete frame into its event and payload.
pub fn decode(bytes: &[u8]) -> Result<(Event, Option<Bytes>)> {
    Frame::decode(bytes).map(Frame::into_parts)
}
