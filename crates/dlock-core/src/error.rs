//! Session error types.

use std::{io, time::Duration};

use dlock_proto::{Event, ProtocolError};
use thiserror::Error;

/// Errors returned by lock and unlock operations.
///
/// None of these are retried internally; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum LockError {
    /// Dialing the lock server failed. The session stays unconnected.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        /// Remote address that was dialed
        address: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Read or write on the established connection failed.
    #[error("connection i/o failed: {0}")]
    Io(#[from] io::Error),

    /// The connection was closed before the operation completed.
    #[error("connection closed")]
    ConnectionClosed,

    /// No reply arrived within the configured deadline.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The server did not accept the shared secret.
    #[error("identity authentication failed{}", reply_suffix(.reply))]
    AuthenticationFailed {
        /// Reply event, if a well-formed reply was received
        reply: Option<Event>,
    },

    /// An outgoing frame could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[source] ProtocolError),

    /// An incoming frame could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[source] ProtocolError),

    /// A lock is already held or requested on this session, or the server
    /// reports the key as already locked by this client.
    #[error("lock already held; do not repeat the operation")]
    AlreadyLocked,

    /// Unlock was requested without an active lock.
    #[error("the lock has not been applied yet, but an attempt has been made to unlock it")]
    NotLocked,

    /// The server has no lock for this client.
    #[error("no such lock on the server")]
    NoSuchLock,

    /// The lock was not released in time (ours or a previous holder's).
    #[error("not unlocked in time")]
    NotUnlockedInTime,

    /// The server is congested and did not grant the lock.
    #[error("congestion ahead")]
    Congested,

    /// The server replied with an event that does not grant the lock.
    #[error("busy (server replied {reply})")]
    Busy {
        /// Unclassified reply event
        reply: Event,
    },
}

impl LockError {
    /// True for failures of the underlying connection.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Io(_) | Self::ConnectionClosed)
    }

    /// Map a read failure to the session error space.
    ///
    /// An unexpected EOF means the peer closed the socket.
    pub fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof { Self::ConnectionClosed } else { Self::Io(err) }
    }
}

fn reply_suffix(reply: &Option<Event>) -> String {
    reply.map(|event| format!(" (server replied {event})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_maps_to_connection_closed() {
        let err = LockError::from_read(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert!(matches!(err, LockError::ConnectionClosed));
        assert!(err.is_connection());

        let err = LockError::from_read(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(matches!(err, LockError::Io(_)));
    }

    #[test]
    fn authentication_message_names_reply() {
        let err = LockError::AuthenticationFailed { reply: Some(Event::AuthFail) };
        assert_eq!(err.to_string(), "identity authentication failed (server replied authFail)");

        let err = LockError::AuthenticationFailed { reply: None };
        assert_eq!(err.to_string(), "identity authentication failed");
    }

    #[test]
    fn protocol_failures_are_not_connection_failures() {
        let err = LockError::Protocol(ProtocolError::UnrecognizedPacket { tag: 0 });
        assert!(!err.is_connection());
        assert!(!LockError::Busy { reply: Event::TypeError }.is_connection());
    }
}
