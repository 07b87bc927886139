//! Frame-oriented reads and writes over async byte streams.

use bytes::BytesMut;
use dlock_proto::{Frame, FrameHeader};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::LockError;

/// Reads whole frames from a stream.
///
/// Each read consumes exactly one header and the payload it declares, so
/// frames that arrive back to back are never merged or split.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a stream.
    pub fn new(inner: R) -> Self {
        Self { inner, buf: BytesMut::with_capacity(FrameHeader::SIZE + Frame::MAX_PAYLOAD) }
    }

    /// Read the next frame.
    ///
    /// EOF maps to [`LockError::ConnectionClosed`], undecodable bytes to
    /// [`LockError::Protocol`].
    pub async fn read_frame(&mut self) -> Result<Frame, LockError> {
        let mut header = [0u8; FrameHeader::SIZE];
        self.inner.read_exact(&mut header).await.map_err(LockError::from_read)?;

        let payload_len = FrameHeader::from_bytes(&header)
            .and_then(FrameHeader::payload_len)
            .map_err(LockError::Protocol)?;

        self.buf.clear();
        self.buf.extend_from_slice(&header);
        self.buf.resize(FrameHeader::SIZE + payload_len, 0);
        self.inner
            .read_exact(&mut self.buf[FrameHeader::SIZE..])
            .await
            .map_err(LockError::from_read)?;

        let frame = Frame::decode(&self.buf).map_err(LockError::Protocol)?;
        trace!(event = %frame.event(), len = self.buf.len(), "frame received");
        Ok(frame)
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Write one frame and flush it.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), LockError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(&frame.to_bytes()).await?;
    writer.flush().await?;
    trace!(event = %frame.event(), "frame sent");
    Ok(())
}
