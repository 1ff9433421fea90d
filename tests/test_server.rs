mod common;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use common::{assert_closed, demo_router, read_response};
use rawhttp::config::Config;
use rawhttp::server::tls::load_tls_acceptor;
use rawhttp::server::listener::{accept_failed, ACCEPT_BACKOFF};
use rawhttp::server::Server;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

async fn start(
    config: Config,
) -> (SocketAddr, oneshot::Sender<()>, JoinHandle<anyhow::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = Server::new(config, demo_router());
    let handle = tokio::spawn(server.serve(listener, None, async move {
        let _ = stop_rx.await;
    }));

    (addr, stop_tx, handle)
}

#[tokio::test]
async fn test_serves_over_loopback() {
    let (addr, stop, handle) = start(Config::default()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /ping HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let response = read_response(&mut stream).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), "pong");

    stream
        .write_all(b"GET /users/42 HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    assert_eq!(read_response(&mut stream).await.text(), "user 42");

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_connections_are_independent() {
    let (addr, stop, handle) = start(Config::default()).await;

    let mut bad = TcpStream::connect(addr).await.unwrap();
    let mut good = TcpStream::connect(addr).await.unwrap();

    bad.write_all(b"BROKEN\r\n\r\n").await.unwrap();
    assert_eq!(read_response(&mut bad).await.status, 400);
    assert_closed(&mut bad).await;

    good.write_all(b"GET /panic HTTP/1.1\r\n\r\n").await.unwrap();
    assert_eq!(read_response(&mut good).await.status, 500);
    good.write_all(b"GET /ping HTTP/1.1\r\n\r\n").await.unwrap();
    assert_eq!(read_response(&mut good).await.text(), "pong");

    // New connections are still accepted after the fault.
    let mut fresh = TcpStream::connect(addr).await.unwrap();
    fresh.write_all(b"GET /users/9 HTTP/1.1\r\n\r\n").await.unwrap();
    assert_eq!(read_response(&mut fresh).await.text(), "user 9");

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_drains_idle_connections() {
    let config = Config {
        shutdown_grace: Duration::from_secs(2),
        ..Config::default()
    };
    let (addr, stop, handle) = start(config).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET /ping HTTP/1.1\r\n\r\n").await.unwrap();
    assert_eq!(read_response(&mut stream).await.status, 200);

    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("idle session held up shutdown")
        .unwrap()
        .unwrap();
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn test_shutdown_aborts_after_grace() {
    let config = Config {
        shutdown_grace: Duration::from_millis(100),
        ..Config::default()
    };
    let (addr, stop, handle) = start(config).await;

    // A body that never completes keeps the session busy past the flag.
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST /echo HTTP/1.1\r\nContent-Length: 10\r\n\r\nab")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("grace period was not enforced")
        .unwrap()
        .unwrap();
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn test_accept_failure_backs_off() {
    let started = Instant::now();
    accept_failed(std::io::Error::other("too many open files"), "plain").await;
    assert!(started.elapsed() >= ACCEPT_BACKOFF);
}

#[test]
fn test_tls_missing_files() {
    let dir = std::env::temp_dir();
    let err = load_tls_acceptor(
        &dir.join("rawhttp-missing.crt"),
        &dir.join("rawhttp-missing.key"),
    )
    .err()
    .unwrap();
    assert!(format!("{err:#}").contains("rawhttp-missing.crt"));
}

#[test]
fn test_tls_file_without_certificates() {
    let dir = std::env::temp_dir();
    let cert = dir.join(format!("rawhttp-empty-{}.crt", std::process::id()));
    let key = dir.join(format!("rawhttp-empty-{}.key", std::process::id()));
    std::fs::write(&cert, "not a pem file\n").unwrap();
    std::fs::write(&key, "not a pem file\n").unwrap();

    let err = load_tls_acceptor(&cert, &key).err().unwrap();
    assert!(format!("{err:#}").contains("no certificates"));

    std::fs::remove_file(&cert).unwrap();
    std::fs::remove_file(&key).unwrap();
}
