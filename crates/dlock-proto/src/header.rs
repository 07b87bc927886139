//! Fixed 2-byte frame header.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{Event, ProtocolError, Result};

/// Frame header: event tag and payload length.
///
/// The layout is byte-for-byte the wire format, so parsing is a checked cast
/// of the first two bytes of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct FrameHeader {
    event: u8,
    length: u8,
}

impl FrameHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 2;

    /// Build a header for `event` declaring `length` payload bytes.
    pub fn new(event: Event, length: u8) -> Self {
        Self { event: event.to_u8(), length }
    }

    /// View the header at the start of `bytes`.
    ///
    /// The event tag is not validated here; call [`FrameHeader::event`].
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(header, _)| header)
            .map_err(|_| ProtocolError::Truncated { len: bytes.len() })
    }

    /// Raw event tag.
    pub fn tag(&self) -> u8 {
        self.event
    }

    /// Parsed event tag.
    pub fn event(&self) -> Result<Event> {
        Event::try_from(self.event)
    }

    /// Declared payload length. Zero for events without payload.
    pub fn length(&self) -> u8 {
        self.length
    }

    /// Number of payload bytes a reader must consume after this header.
    ///
    /// Only `Auth` and `Lock` frames have a payload; for every other event the
    /// length byte is ignored.
    pub fn payload_len(&self) -> Result<usize> {
        let event = self.event()?;
        Ok(if event.carries_payload() { usize::from(self.length) } else { 0 })
    }

    /// Header as wire bytes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [self.event, self.length]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefix_of_longer_buffer() {
        let bytes = [0x03, 0x02, b'h', b'i'];
        let header = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.event().unwrap(), Event::Lock);
        assert_eq!(header.length(), 2);
        assert_eq!(header.payload_len().unwrap(), 2);
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(FrameHeader::from_bytes(&[0x09]), Err(ProtocolError::Truncated { len: 1 }));
        assert_eq!(FrameHeader::from_bytes(&[]), Err(ProtocolError::Truncated { len: 0 }));
    }

    #[test]
    fn length_ignored_for_control_events() {
        let header = FrameHeader::from_bytes(&[0x0C, 0x07]).unwrap();
        assert_eq!(header.payload_len().unwrap(), 0);
    }

    #[test]
    fn as_bytes_matches_wire_layout() {
        let header = FrameHeader::new(Event::Auth, 6);
        assert_eq!(header.as_bytes(), &[0x02, 0x06]);
        assert_eq!(header.to_bytes(), [0x02, 0x06]);
    }
}
