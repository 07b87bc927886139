//! Connection lifecycle.
//!
//! A [`Connection`] owns the write half of the socket and the teardown path.
//! The read half is returned separately by [`Connection::open`] because it
//! changes hands: the session reads the authentication and lock replies, then
//! gives it to the background listener.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use dlock_core::{FrameReader, LockError, SessionState, Transport, write_frame};
use dlock_proto::Frame;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf},
    sync::Mutex,
};
use tracing::debug;

/// Write half of a dialed connection plus its single-close guard.
pub(crate) struct Connection<S> {
    address: String,
    writer: Mutex<Option<WriteHalf<S>>>,
    closed: AtomicBool,
    state: Arc<SessionState>,
    epoch: u64,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Dial `address` and split the stream.
    ///
    /// On failure nothing is recorded in `state`, so the caller may retry.
    pub(crate) async fn open<T>(
        transport: &T,
        address: &str,
        state: Arc<SessionState>,
    ) -> Result<(Arc<Self>, FrameReader<ReadHalf<S>>), LockError>
    where
        T: Transport<Stream = S>,
    {
        let stream = transport
            .connect(address)
            .await
            .map_err(|source| LockError::Connect { address: address.to_owned(), source })?;
        let (read_half, write_half) = tokio::io::split(stream);

        let epoch = state.mark_connected();
        debug!(address, epoch, "connected");

        let connection = Self {
            address: address.to_owned(),
            writer: Mutex::new(Some(write_half)),
            closed: AtomicBool::new(false),
            state,
            epoch,
        };
        Ok((Arc::new(connection), FrameReader::new(read_half)))
    }

    /// Send one frame.
    pub(crate) async fn send(&self, frame: &Frame) -> Result<(), LockError> {
        let mut writer = self.writer.lock().await;
        let writer = writer.as_mut().ok_or(LockError::ConnectionClosed)?;
        write_frame(writer, frame).await
    }

    /// True once [`Connection::close`] has run.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Shut the socket down and clear the session flags if they still
    /// describe this connection.
    ///
    /// Only the first call does anything, however many paths race to it.
    /// Returns whether this call performed the close.
    pub(crate) async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.state.reset_connection(self.epoch);

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(err) = writer.shutdown().await {
                debug!(address = %self.address, error = %err, "shutdown failed");
            }
        }
        debug!(address = %self.address, "connection closed");
        true
    }
}
