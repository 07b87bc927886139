//! Background listener.
//!
//! One listener task is spawned per lock call, before the lock request goes
//! out. It parks on the handoff until the session has consumed the lock
//! acknowledgement, then owns the read half for the rest of the connection's
//! life.
//!
//! Every exit path closes the connection, and it is closed *before* the
//! outcome is delivered, so a caller returning from `unlock()` always sees a
//! torn-down session. Exiting without an outcome drops the sender, which
//! releases a pending `unlock()` with [`LockError::ConnectionClosed`].

use std::sync::Arc;

use dlock_core::{FrameReader, ListenerStep, LockError, classify_listener_event};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadHalf},
    sync::oneshot,
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::connection::Connection;

/// Result handed from the listener to `unlock()`.
pub(crate) type Outcome = Result<(), LockError>;

/// One-shot carrying the read half from the session to the listener.
pub(crate) type Handoff<S> = oneshot::Sender<FrameReader<ReadHalf<S>>>;

pub(crate) struct Listener<S> {
    connection: Arc<Connection<S>>,
    handoff: oneshot::Receiver<FrameReader<ReadHalf<S>>>,
    outcome: oneshot::Sender<Outcome>,
}

impl<S> Listener<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Start a listener for `connection`.
    ///
    /// Returns the handoff sender (must be used or dropped exactly once for
    /// this lock call), the receiver for the unlock outcome and the task
    /// handle.
    pub(crate) fn spawn(
        connection: Arc<Connection<S>>,
    ) -> (Handoff<S>, oneshot::Receiver<Outcome>, JoinHandle<()>) {
        let (handoff_tx, handoff) = oneshot::channel();
        let (outcome, outcome_rx) = oneshot::channel();
        let task = tokio::spawn(Self { connection, handoff, outcome }.run());
        (handoff_tx, outcome_rx, task)
    }

    async fn run(self) {
        let Self { connection, handoff, outcome } = self;

        let Ok(mut reader) = handoff.await else {
            debug!("lock not granted, listener exiting");
            connection.close().await;
            return;
        };

        let delivered = loop {
            let frame = match reader.read_frame().await {
                Ok(frame) => frame,
                Err(err) => {
                    debug!(error = %err, "listener read ended");
                    break None;
                },
            };

            match classify_listener_event(frame.event()) {
                ListenerStep::Continue => debug!(event = %frame.event(), "ignoring notice"),
                ListenerStep::Deliver(result) => {
                    debug!(event = %frame.event(), "unlock outcome resolved");
                    break Some(result);
                },
                ListenerStep::Stop => {
                    warn!(event = %frame.event(), "unexpected event while holding lock");
                    break None;
                },
            }
        };

        drop(reader);
        connection.close().await;

        if let Some(result) = delivered {
            // Nobody may be waiting yet; the value then waits in the channel
            let _ = outcome.send(result);
        }
    }
}
