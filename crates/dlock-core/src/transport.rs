//! Transport abstraction for the lock server connection.
//!
//! A session needs exactly one reliable, ordered byte stream to the server.
//! Production dials TCP; tests dial through a simulated network so that
//! deadlines run on virtual time.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Dials byte streams to a lock server.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connected stream type.
    ///
    /// The session splits it into a read half, which moves to the background
    /// listener, and a write half, which stays with the session.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connect to the server at `address` (`host:port`).
    ///
    /// Returns once the stream is established.
    async fn connect(&self, address: &str) -> io::Result<Self::Stream>;
}
