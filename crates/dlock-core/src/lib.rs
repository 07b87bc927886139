//! dlock core logic
//!
//! The parts of a dlock client that do not own a socket: the error taxonomy,
//! session configuration, the shared session state object, classification of
//! server replies, frame-oriented I/O helpers and the transport abstraction.
//!
//! # Components
//!
//! - [`error`]: [`LockError`], the error every session operation returns
//! - [`config`]: [`SessionConfig`] deadlines
//! - [`state`]: [`SessionState`] flags, [`LockPhase`], reply classification
//! - [`framed`]: [`FrameReader`] and [`write_frame`] over async streams
//! - [`transport`]: [`Transport`] abstraction (TCP in production, simulated in tests)

pub mod config;
pub mod error;
pub mod framed;
pub mod state;
pub mod transport;

pub use config::SessionConfig;
pub use error::LockError;
pub use framed::{FrameReader, write_frame};
pub use state::{ListenerStep, LockPhase, SessionState, classify_listener_event, interpret_lock_reply};
pub use transport::Transport;
