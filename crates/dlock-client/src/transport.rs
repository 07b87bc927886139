//! TCP transport.

use std::io;

use async_trait::async_trait;
use dlock_core::Transport;
use tokio::net::TcpStream;

/// Dials lock servers over TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    type Stream = TcpStream;

    async fn connect(&self, address: &str) -> io::Result<Self::Stream> {
        let stream = TcpStream::connect(address).await?;
        // Frames are tiny request/response pairs
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
