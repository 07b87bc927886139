//! Scripted fake lock server.
//!
//! The server is not a lock service: it answers each request with whatever
//! the [`ServerScript`] says and records what it received in a [`ServerLog`].
//! Tests drive the client against exact reply sequences this way.

use std::{
    net::{IpAddr, Ipv4Addr},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;
use dlock_core::{FrameReader, LockError, write_frame};
use dlock_proto::{Event, Frame};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Replies the fake server sends for each request.
#[derive(Debug, Clone)]
pub struct ServerScript {
    secret: Bytes,
    lock_replies: Vec<Event>,
    unlock_replies: Vec<Event>,
    hang_up_on_unlock: bool,
}

impl ServerScript {
    /// A well-behaved server: accepts `secret`, grants every lock, confirms
    /// every unlock.
    pub fn granting(secret: impl Into<Bytes>) -> Self {
        Self {
            secret: secret.into(),
            lock_replies: vec![Event::LockOk],
            unlock_replies: vec![Event::UnlockOk],
            hang_up_on_unlock: false,
        }
    }

    /// Replace the frames sent in answer to a lock request. An empty list
    /// leaves the request unanswered.
    #[must_use]
    pub fn on_lock(mut self, replies: impl IntoIterator<Item = Event>) -> Self {
        self.lock_replies = replies.into_iter().collect();
        self
    }

    /// Never answer lock requests.
    #[must_use]
    pub fn silent_on_lock(self) -> Self {
        self.on_lock([])
    }

    /// Replace the frames sent in answer to an unlock request.
    #[must_use]
    pub fn on_unlock(mut self, replies: impl IntoIterator<Item = Event>) -> Self {
        self.unlock_replies = replies.into_iter().collect();
        self
    }

    /// Drop the connection instead of answering an unlock request.
    #[must_use]
    pub fn hang_up_on_unlock(mut self) -> Self {
        self.hang_up_on_unlock = true;
        self
    }

    /// Frames to send in answer to `request`.
    pub fn replies_to(&self, request: &Frame) -> Vec<Event> {
        match request.event() {
            Event::Auth if request.payload() == Some(&self.secret) => vec![Event::AuthOk],
            Event::Auth => vec![Event::AuthFail],
            Event::Lock => self.lock_replies.clone(),
            Event::Unlock => self.unlock_replies.clone(),
            _ => vec![Event::TypeError],
        }
    }
}

#[derive(Debug, Default)]
struct Recorded {
    frames: Vec<Frame>,
    connections: usize,
    closed_by_peer: usize,
}

/// What the fake server observed. Cheap to clone; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct ServerLog {
    inner: Arc<Mutex<Recorded>>,
}

impl ServerLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every frame received, in order, across connections.
    pub fn frames(&self) -> Vec<Frame> {
        self.recorded().frames.clone()
    }

    /// Events of every frame received.
    pub fn events(&self) -> Vec<Event> {
        self.recorded().frames.iter().map(Frame::event).collect()
    }

    /// Connections accepted.
    pub fn connections(&self) -> usize {
        self.recorded().connections
    }

    /// Connections the client closed (EOF or reset seen by the server).
    pub fn closed_by_peer(&self) -> usize {
        self.recorded().closed_by_peer
    }
}

/// Serve one client connection until it closes.
///
/// Connection-level failures end the connection quietly; only a protocol
/// violation by the client is answered, with `decodeFail`, before hanging up.
pub async fn serve_connection<S>(stream: S, script: &ServerScript, log: &ServerLog)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    log.recorded().connections += 1;
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = FrameReader::new(read_half);

    loop {
        let request = match reader.read_frame().await {
            Ok(request) => request,
            Err(LockError::Protocol(err)) => {
                debug!(error = %err, "client sent undecodable frame");
                let _ = write_frame(&mut write_half, &Frame::control(Event::DecodeFail)).await;
                return;
            },
            Err(err) => {
                debug!(error = %err, "client went away");
                log.recorded().closed_by_peer += 1;
                return;
            },
        };

        debug!(event = %request.event(), "server received");
        let hang_up = request.event() == Event::Unlock && script.hang_up_on_unlock;
        let replies = script.replies_to(&request);
        log.recorded().frames.push(request);
        if hang_up {
            debug!("hanging up instead of answering unlock");
            return;
        }

        for reply in replies {
            if let Err(err) = write_frame(&mut write_half, &Frame::control(reply)).await {
                debug!(error = %err, "reply failed");
                return;
            }
        }
    }
}

/// Accept connections on `port` inside a turmoil host, serving them one
/// after another.
pub async fn run_sim_server(port: u16, script: ServerScript, log: ServerLog) -> turmoil::Result {
    let listener = turmoil::net::TcpListener::bind((IpAddr::from(Ipv4Addr::UNSPECIFIED), port)).await?;
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "server accepted");
        serve_connection(stream, &script, &log).await;
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::duplex;

    use super::*;

    #[test]
    fn auth_checks_the_secret() {
        let script = ServerScript::granting("s3cret");

        let good = Frame::new(Event::Auth, "s3cret").unwrap();
        let bad = Frame::new(Event::Auth, "guess").unwrap();
        assert_eq!(script.replies_to(&good), vec![Event::AuthOk]);
        assert_eq!(script.replies_to(&bad), vec![Event::AuthFail]);
    }

    #[test]
    fn scripted_replies() {
        let script = ServerScript::granting("s")
            .on_lock([Event::LockOk, Event::OperateTimeout])
            .on_unlock([Event::NotFindLock]);
        let lock = Frame::new(Event::Lock, "k").unwrap();

        assert_eq!(script.replies_to(&lock), vec![Event::LockOk, Event::OperateTimeout]);
        assert_eq!(script.replies_to(&Frame::control(Event::Unlock)), vec![Event::NotFindLock]);
        assert!(script.clone().silent_on_lock().replies_to(&lock).is_empty());
    }

    #[tokio::test]
    async fn records_frames_and_peer_close() {
        let (mut client, server) = duplex(64);
        let script = ServerScript::granting("s");
        let log = ServerLog::new();

        let serving = {
            let log = log.clone();
            tokio::spawn(async move { serve_connection(server, &script, &log).await })
        };

        write_frame(&mut client, &Frame::new(Event::Auth, "s").unwrap()).await.unwrap();
        let mut reader = FrameReader::new(&mut client);
        assert_eq!(reader.read_frame().await.unwrap().event(), Event::AuthOk);
        drop(reader);
        drop(client);

        serving.await.unwrap();
        assert_eq!(log.events(), vec![Event::Auth]);
        assert_eq!(log.connections(), 1);
        assert_eq!(log.closed_by_peer(), 1);
    }
}
