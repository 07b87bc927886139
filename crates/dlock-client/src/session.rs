//! Lock session.

use std::{fmt, sync::Arc};

use bytes::Bytes;
use dlock_core::{
    FrameReader, LockError, LockPhase, SessionConfig, SessionState, Transport, interpret_lock_reply,
};
use dlock_proto::{Event, Frame};
use tokio::{io::ReadHalf, sync::oneshot, task::JoinHandle, time::timeout};
use tracing::{debug, info, instrument, warn};

use crate::{
    TcpTransport,
    connection::Connection,
    listener::{Handoff, Listener, Outcome},
};

/// Client-side handle for one lock on a remote dlock server.
///
/// A session holds at most one lock at a time. It is not meant to be shared
/// between tasks; give each concurrent worker its own session.
///
/// Dropping a session aborts its background listener, which closes the
/// socket; the server then releases whatever the session held.
pub struct Session<T: Transport = TcpTransport> {
    address: String,
    secret_key: Bytes,
    config: SessionConfig,
    transport: T,
    state: Arc<SessionState>,
    connection: Option<Arc<Connection<T::Stream>>>,
    /// Read half, owned here until handed to the listener
    reader: Option<FrameReader<ReadHalf<T::Stream>>>,
    authenticated: bool,
    unlock_outcome: Option<oneshot::Receiver<Outcome>>,
    listener: Option<JoinHandle<()>>,
}

impl Session<TcpTransport> {
    /// Session that dials `address` over TCP and authenticates with
    /// `secret_key`.
    ///
    /// Nothing is dialed until the first [`Session::lock`].
    pub fn new(address: impl Into<String>, secret_key: impl Into<Bytes>) -> Self {
        Self::with_transport(TcpTransport, address, secret_key)
    }
}

impl<T: Transport> Session<T> {
    /// Session over a custom transport.
    pub fn with_transport(
        transport: T,
        address: impl Into<String>,
        secret_key: impl Into<Bytes>,
    ) -> Self {
        Self {
            address: address.into(),
            secret_key: secret_key.into(),
            config: SessionConfig::default(),
            transport,
            state: Arc::new(SessionState::new()),
            connection: None,
            reader: None,
            authenticated: false,
            unlock_outcome: None,
            listener: None,
        }
    }

    /// Replace the session configuration.
    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Remote address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// True while a connection is open.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// True between a lock request and the end of the matching unlock.
    pub fn is_holding(&self) -> bool {
        self.state.is_holding()
    }

    /// Current protocol phase.
    pub fn phase(&self) -> LockPhase {
        self.state.phase()
    }

    /// Acquire the lock named `key`.
    ///
    /// Dials and authenticates if needed, sends the request and waits up to
    /// [`SessionConfig::lock_ack_timeout`] for the first reply. On any failure
    /// the connection is torn down and the session is idle again.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] without network traffic if this session
    ///   already holds or requested a lock
    /// - [`LockError::Encode`] if `key` is empty or longer than 255 bytes
    /// - connection and authentication errors, unchanged
    /// - [`LockError::Timeout`] if the server does not answer in time
    /// - the server's refusal: `NotUnlockedInTime`, `Congested`,
    ///   `AlreadyLocked`, `NoSuchLock` or `Busy`
    #[instrument(skip_all, fields(address = %self.address))]
    pub async fn lock(&mut self, key: impl AsRef<[u8]>) -> Result<(), LockError> {
        if self.state.is_holding() {
            return Err(LockError::AlreadyLocked);
        }

        let key = key.as_ref();
        let request =
            Frame::new(Event::Lock, Bytes::copy_from_slice(key)).map_err(LockError::Encode)?;

        let connection = self.ensure_connected().await?;
        if !self.authenticated {
            if let Err(err) = self.authenticate(&connection).await {
                self.teardown().await;
                return Err(err);
            }
            self.authenticated = true;
        }

        self.state.begin_hold()?;
        let (handoff, unlock_outcome, task) = Listener::spawn(Arc::clone(&connection));
        self.listener = Some(task);

        let result = self
            .await_lock_reply(&connection, &request)
            .await
            .and_then(interpret_lock_reply)
            .and_then(|()| self.hand_off(handoff));

        match result {
            Ok(()) => {
                self.unlock_outcome = Some(unlock_outcome);
                self.state.set_phase(LockPhase::Locked);
                info!(key = %String::from_utf8_lossy(key), "lock acquired");
                Ok(())
            },
            Err(err) => {
                debug!(error = %err, "lock not granted");
                self.teardown().await;
                Err(err)
            },
        }
    }

    /// Release the held lock.
    ///
    /// Sends the unlock request and waits for the listener to resolve the
    /// server's answer. There is no deadline unless
    /// [`SessionConfig::unlock_timeout`] is set. The hold is cleared whatever
    /// the outcome.
    ///
    /// # Errors
    ///
    /// - [`LockError::NotLocked`] if no lock connection is open
    /// - connection errors while sending, or [`LockError::ConnectionClosed`]
    ///   if the connection ends before the server answers
    /// - [`LockError::NoSuchLock`] or [`LockError::NotUnlockedInTime`] as
    ///   reported by the server
    #[instrument(skip_all, fields(address = %self.address))]
    pub async fn unlock(&mut self) -> Result<(), LockError> {
        let result = self.release().await;
        self.state.release_hold();

        match &result {
            Ok(()) => info!("lock released"),
            Err(err) => warn!(error = %err, "unlock failed"),
        }
        result
    }

    async fn ensure_connected(&mut self) -> Result<Arc<Connection<T::Stream>>, LockError> {
        if let Some(connection) = &self.connection {
            if !connection.is_closed() && self.reader.is_some() {
                return Ok(Arc::clone(connection));
            }
        }
        self.teardown().await;

        let (connection, reader) =
            Connection::open(&self.transport, &self.address, Arc::clone(&self.state)).await?;
        self.connection = Some(Arc::clone(&connection));
        self.reader = Some(reader);
        Ok(connection)
    }

    async fn authenticate(&mut self, connection: &Connection<T::Stream>) -> Result<(), LockError> {
        self.state.set_phase(LockPhase::Authenticating);

        let frame = Frame::new(Event::Auth, self.secret_key.clone()).map_err(LockError::Encode)?;
        connection.send(&frame).await?;

        let reader = self.reader.as_mut().ok_or(LockError::ConnectionClosed)?;
        let reply = match self.config.auth_timeout {
            Some(limit) => {
                timeout(limit, reader.read_frame()).await.map_err(|_| LockError::Timeout(limit))?
            },
            None => reader.read_frame().await,
        };

        match reply {
            Ok(frame) if frame.event() == Event::AuthOk => {
                debug!("authenticated");
                Ok(())
            },
            Ok(frame) => {
                warn!(reply = %frame.event(), "authentication rejected");
                Err(LockError::AuthenticationFailed { reply: Some(frame.event()) })
            },
            Err(err) => {
                warn!(error = %err, "authentication reply unreadable");
                Err(LockError::AuthenticationFailed { reply: None })
            },
        }
    }

    async fn await_lock_reply(
        &mut self,
        connection: &Connection<T::Stream>,
        request: &Frame,
    ) -> Result<Event, LockError> {
        connection.send(request).await?;

        let reader = self.reader.as_mut().ok_or(LockError::ConnectionClosed)?;
        let limit = self.config.lock_ack_timeout;
        let frame =
            timeout(limit, reader.read_frame()).await.map_err(|_| LockError::Timeout(limit))??;

        debug!(reply = %frame.event(), "lock reply received");
        Ok(frame.event())
    }

    /// Give the read half to the listener.
    fn hand_off(&mut self, handoff: Handoff<T::Stream>) -> Result<(), LockError> {
        let reader = self.reader.take().ok_or(LockError::ConnectionClosed)?;
        handoff.send(reader).map_err(|_| LockError::ConnectionClosed)
    }

    async fn release(&mut self) -> Result<(), LockError> {
        let connection = match &self.connection {
            Some(connection) if !connection.is_closed() => Arc::clone(connection),
            _ => return Err(LockError::NotLocked),
        };
        let Some(outcome) = self.unlock_outcome.take() else {
            return Err(LockError::NotLocked);
        };

        self.state.set_phase(LockPhase::Unlocking);
        if let Err(err) = connection.send(&Frame::control(Event::Unlock)).await {
            self.teardown().await;
            return Err(err);
        }

        let delivered = match self.config.unlock_timeout {
            Some(limit) => {
                if let Ok(delivered) = timeout(limit, outcome).await {
                    delivered
                } else {
                    self.teardown().await;
                    return Err(LockError::Timeout(limit));
                }
            },
            None => outcome.await,
        };

        // Sender dropped: the listener exited without an answer
        delivered.unwrap_or(Err(LockError::ConnectionClosed))
    }

    /// Drop all per-connection state and close the socket if still open.
    async fn teardown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.reader = None;
        self.unlock_outcome = None;
        self.authenticated = false;

        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
        self.state.reset();
    }
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("phase", &self.state.phase())
            .field("connected", &self.state.is_connected())
            .field("holding", &self.state.is_holding())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
