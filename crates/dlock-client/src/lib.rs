//! Client
//!
//! Lets independent processes take turns on a named resource by holding a
//! lock on a remote dlock server.
//!
//! # Architecture
//!
//! A [`Session`] owns one connection. [`Session::lock`] dials lazily,
//! authenticates once per connection, sends the lock request and waits for
//! the first reply. From then on a background listener task owns the read
//! half of the socket: it ignores repeated `lockOK` notices and resolves the
//! outcome that [`Session::unlock`] waits for. Ownership of the read half
//! moves to the listener through a one-shot handoff created per lock call,
//! so the listener can never consume the lock acknowledgement.
//!
//! ```no_run
//! # async fn run() -> Result<(), dlock_client::LockError> {
//! let mut session = dlock_client::Session::new("127.0.0.1:7668", "secret");
//! session.lock("orders").await?;
//! // exclusive section
//! session.unlock().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`Session`]: lock state machine and public API
//! - [`TcpTransport`]: production [`Transport`]
//! - `connection`: write half and single-close teardown
//! - `listener`: background reader task

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod connection;
mod listener;
mod session;
mod transport;

pub use dlock_core::{LockError, LockPhase, SessionConfig, Transport};
pub use dlock_proto::Event;
pub use session::Session;
pub use transport::TcpTransport;
