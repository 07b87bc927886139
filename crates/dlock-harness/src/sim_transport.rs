//! Turmoil-backed transport.

use std::io;

use async_trait::async_trait;
use dlock_core::Transport;
use turmoil::net::TcpStream;

/// Dials through the turmoil simulated network.
///
/// Must be used from inside a turmoil host or client. Addresses are
/// `host:port` with simulation host names, e.g. `"server:7668"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimTransport;

#[async_trait]
impl Transport for SimTransport {
    type Stream = TcpStream;

    async fn connect(&self, address: &str) -> io::Result<Self::Stream> {
        TcpStream::connect(address).await
    }
}
