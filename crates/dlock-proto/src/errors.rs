//! Protocol error types.

use thiserror::Error;

use crate::Event;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A payload-bearing event was given no payload.
    #[error("{event} frame requires a non-empty payload")]
    EmptyPayload {
        /// Event being encoded
        event: Event,
    },

    /// Payload does not fit in the one-byte length field.
    #[error("{event} payload is {size} bytes, the length field holds at most {max}", max = u8::MAX)]
    PayloadTooLarge {
        /// Event being encoded
        event: Event,
        /// Size of the rejected payload
        size: usize,
    },

    /// The event tag is not part of the protocol.
    #[error("unrecognized packet: event tag {tag:#04x}")]
    UnrecognizedPacket {
        /// Raw tag from byte 0
        tag: u8,
    },

    /// Declared payload length disagrees with the bytes present.
    #[error("malformed {event} packet: declared length {declared}, {actual} payload bytes present")]
    MalformedPacket {
        /// Event whose payload was malformed
        event: Event,
        /// Value of the length byte
        declared: u8,
        /// Bytes actually following the header
        actual: usize,
    },

    /// Buffer is too short to hold the frame header.
    #[error("packet truncated: {len} bytes, header needs {}", crate::FrameHeader::SIZE)]
    Truncated {
        /// Length of the buffer
        len: usize,
    },
}

impl ProtocolError {
    /// True for errors produced while building an outgoing frame.
    pub fn is_encoding(&self) -> bool {
        matches!(self, Self::EmptyPayload { .. } | Self::PayloadTooLarge { .. })
    }
}
