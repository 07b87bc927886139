//! Session behaviour over real TCP sockets on localhost.

use std::time::Duration;

use dlock_client::{Event, LockError, Session, SessionConfig};
use dlock_harness::{ServerLog, ServerScript, init_tracing, serve_connection};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};

const SECRET: &str = "xxx";

/// Serve exactly one connection with `script` on an ephemeral port.
async fn spawn_server(script: ServerScript) -> (String, ServerLog, JoinHandle<()>) {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let log = ServerLog::new();

    let server_log = log.clone();
    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve_connection(stream, &script, &server_log).await;
    });
    (address, log, task)
}

/// Read the auth frame, answer with `reply` (raw bytes) and hang up.
async fn spawn_auth_responder(reply: &'static [u8]) -> (String, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let task = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut auth = vec![0u8; 2 + SECRET.len()];
        stream.read_exact(&mut auth).await.unwrap();
        stream.write_all(reply).await.unwrap();
        auth
    });
    (address, task)
}

#[tokio::test]
async fn lock_and_unlock_over_tcp() {
    let (address, log, server) = spawn_server(ServerScript::granting(SECRET)).await;
    let mut session = Session::new(address, SECRET);

    session.lock("orders").await.unwrap();
    assert!(session.is_holding());
    session.unlock().await.unwrap();
    assert!(!session.is_connected());

    // The server task only finishes once it reads EOF from the client
    tokio::time::timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert_eq!(log.events(), vec![Event::Auth, Event::Lock, Event::Unlock]);
    assert_eq!(log.closed_by_peer(), 1);
}

#[tokio::test]
async fn unlock_without_connection_is_not_locked() {
    let mut session = Session::new("127.0.0.1:9", SECRET);

    let result = session.unlock().await;
    assert!(matches!(result, Err(LockError::NotLocked)), "got {result:?}");
    assert!(!session.is_holding());
}

#[tokio::test]
async fn dial_failure_leaves_session_retryable() {
    // Reserve a port, then free it so nothing listens there
    let address = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let mut session = Session::new(address.clone(), SECRET);

    let result = session.lock("k").await;
    assert!(
        matches!(&result, Err(LockError::Connect { address: dialed, .. }) if *dialed == address),
        "got {result:?}"
    );
    assert!(!session.is_connected());
    assert!(!session.is_holding());

    let result = session.lock("k").await;
    assert!(matches!(result, Err(LockError::Connect { .. })), "second attempt dials again");
}

#[tokio::test]
async fn invalid_key_fails_before_dialing() {
    let mut session = Session::new("127.0.0.1:9", SECRET);

    let result = session.lock("").await;
    assert!(matches!(result, Err(LockError::Encode(_))), "got {result:?}");

    let result = session.lock(vec![b'k'; 256]).await;
    assert!(matches!(result, Err(LockError::Encode(_))), "got {result:?}");
    assert!(!session.is_connected());
}

#[tokio::test]
async fn configured_lock_deadline() {
    let (address, _log, _server) =
        spawn_server(ServerScript::granting(SECRET).silent_on_lock()).await;
    let config = SessionConfig::default().with_lock_ack_timeout(Duration::from_millis(200));
    let mut session = Session::new(address, SECRET).with_config(config);

    let result = session.lock("k").await;
    assert!(
        matches!(result, Err(LockError::Timeout(limit)) if limit == Duration::from_millis(200)),
        "got {result:?}"
    );
    assert!(!session.is_holding());
    assert!(!session.is_connected());
}

#[tokio::test]
async fn configured_unlock_deadline() {
    let script = ServerScript::granting(SECRET).on_unlock([]);
    let (address, _log, _server) = spawn_server(script).await;
    let config = SessionConfig::default().with_unlock_timeout(Duration::from_millis(200));
    let mut session = Session::new(address, SECRET).with_config(config);

    session.lock("k").await.unwrap();
    let result = session.unlock().await;
    assert!(matches!(result, Err(LockError::Timeout(_))), "got {result:?}");
    assert!(!session.is_holding());
    assert!(!session.is_connected());
}

#[tokio::test]
async fn configured_auth_deadline() {
    // Accepts the connection but never answers anything
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let _server = tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        std::future::pending::<()>().await;
    });

    let config = SessionConfig::default().with_auth_timeout(Duration::from_millis(200));
    let mut session = Session::new(address, SECRET).with_config(config);

    let result = session.lock("k").await;
    assert!(matches!(result, Err(LockError::Timeout(_))), "got {result:?}");
    assert!(!session.is_connected());
}

#[tokio::test]
async fn auth_reply_lost_to_hang_up() {
    init_tracing();
    let (address, server) = spawn_auth_responder(&[]).await;
    let mut session = Session::new(address, SECRET);

    let result = session.lock("k").await;
    assert!(
        matches!(result, Err(LockError::AuthenticationFailed { reply: None })),
        "got {result:?}"
    );
    assert!(!session.is_connected());
    assert!(!session.is_holding());

    let auth = server.await.unwrap();
    assert_eq!(auth, [&[Event::Auth.to_u8(), 3][..], SECRET.as_bytes()].concat());
}

#[tokio::test]
async fn undecodable_auth_reply() {
    init_tracing();
    let (address, _server) = spawn_auth_responder(&[0x7F, 0x00]).await;
    let mut session = Session::new(address, SECRET);

    let result = session.lock("k").await;
    assert!(
        matches!(result, Err(LockError::AuthenticationFailed { reply: None })),
        "got {result:?}"
    );
    assert!(!session.is_connected());
    assert!(!session.is_holding());
}
