//! Wire format for the dlock protocol.
//!
//! Every frame starts with a fixed 2-byte header: the event tag followed by a
//! length byte. Only the two client requests that carry data (`Auth` with the
//! shared secret, `Lock` with the resource key) put a payload after the
//! header, and the length byte caps that payload at 255 bytes. All other
//! frames are exactly the header, with the length byte set to zero.
//!
//! ```text
//! ┌─────────┬──────────┬──────────────────────┐
//! │ event   │ length   │ payload (auth/lock)  │
//! │ 1 byte  │ 1 byte   │ 1..=255 bytes        │
//! └─────────┴──────────┴──────────────────────┘
//! ```
//!
//! # Security
//!
//! Header parsing goes through `zerocopy` layouts, and a payload is only
//! accepted when its declared length matches the bytes actually present.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod event;
pub mod frame;
pub mod header;

pub use errors::{ProtocolError, Result};
pub use event::Event;
pub use frame::{Frame, decode, encode};
pub use header::FrameHeader;
