//! End-to-end tests driving the event loop over real sockets.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dbwarden::{AccessWindowStore, AccessWindowUpdater, MemoryStore, ResourceName, SubjectId};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};

use crate::{ClaimVerifier, RequestHandler, Server, ServerConfig, ServerResult, ShutdownHandle};

const SECRET: &str = "integration-secret";

struct Running {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    thread: JoinHandle<ServerResult<()>>,
}

impl Running {
    fn stop(self) {
        self.shutdown.shutdown();
        self.thread.join().unwrap().unwrap();
    }
}

fn start(store: Arc<MemoryStore>, config: ServerConfig) -> Running {
    let handler = RequestHandler::new(
        ClaimVerifier::new(SECRET),
        AccessWindowUpdater::new(store),
    );
    let mut server = Server::new(config, handler).unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    let thread = thread::spawn(move || server.run());
    Running {
        addr,
        shutdown,
        thread,
    }
}

fn local_config() -> ServerConfig {
    ServerConfig::new(([127, 0, 0, 1], 0))
}

fn send(addr: SocketAddr, raw: &[u8]) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream.write_all(raw).unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();

    let status = response
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status, body)
}

fn post_claim(addr: SocketAddr, token: &str) -> (u16, Value) {
    let body = json!({"client_message": token}).to_string();
    let raw = format!(
        "POST /jwt HTTP/1.1\r\nHost: test\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let (status, body) = send(addr, raw.as_bytes());
    (status, serde_json::from_str(&body).unwrap())
}

fn token(subject: &str, dbauth: &str) -> String {
    encode(
        &Header::default(),
        &json!({"subject": subject, "dbauth": dbauth}),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

#[test]
fn test_claim_round_trip_over_tcp() {
    let store = Arc::new(MemoryStore::new());
    let server = start(store.clone(), local_config());

    let (status, body) = post_claim(server.addr, &token("u1", "accounts:allow:always"));
    assert_eq!(status, 200);
    assert_eq!(body["server_message"], "JWT received!");

    let window = store
        .read(
            &SubjectId::new("u1"),
            &ResourceName::new("accounts"),
            Duration::from_secs(1),
        )
        .unwrap();
    assert!(window.access_until.unwrap().is_far_future());

    let (status, body) = send(server.addr, b"GET /check/u1/accounts HTTP/1.1\r\n\r\n");
    assert_eq!(status, 200);
    assert!(body.contains("\"effect\":\"allow\""));

    server.stop();
}

#[test]
fn test_put_window_then_check_over_tcp() {
    let store = Arc::new(MemoryStore::new());
    let server = start(store.clone(), local_config());

    let body = json!({"access_until": "9999-12-31"}).to_string();
    let raw = format!(
        "PUT /access/u2/ledger HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let (status, body) = send(server.addr, raw.as_bytes());
    assert_eq!(status, 200);
    assert!(body.contains("1 rows inserted"));

    let (status, body) = send(server.addr, b"GET /check/u2/ledger HTTP/1.1\r\n\r\n");
    assert_eq!(status, 200);
    assert!(body.contains("\"effect\":\"allow\""));

    server.stop();
}

#[test]
fn test_bad_signature_over_tcp() {
    let server = start(Arc::new(MemoryStore::new()), local_config());

    let forged = encode(
        &Header::default(),
        &json!({"subject": "u1", "dbauth": "accounts:allow:always"}),
        &EncodingKey::from_secret(b"guess"),
    )
    .unwrap();
    let (status, body) = post_claim(server.addr, &forged);
    assert_eq!(status, 401);
    assert_eq!(body["server_message"], "wrong JWT signature!");

    server.stop();
}

#[test]
fn test_request_split_across_writes() {
    let server = start(Arc::new(MemoryStore::new()), local_config());

    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream.write_all(b"GET /hea").unwrap();
    stream.flush().unwrap();
    thread::sleep(Duration::from_millis(50));
    stream.write_all(b"lth HTTP/1.1\r\n\r\n").unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));

    server.stop();
}

#[test]
fn test_oversized_request_is_rejected() {
    let config = local_config().with_max_request_bytes(128);
    let server = start(Arc::new(MemoryStore::new()), config);

    let body = "x".repeat(512);
    let raw = format!(
        "POST /jwt HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let (status, _) = send(server.addr, raw.as_bytes());
    assert_eq!(status, 413);

    server.stop();
}

#[test]
fn test_connection_over_limit_gets_503() {
    let config = local_config().with_max_connections(1);
    let server = start(Arc::new(MemoryStore::new()), config);

    // Holds the only slot without sending a request
    let _held = TcpStream::connect(server.addr).unwrap();
    thread::sleep(Duration::from_millis(200));

    let mut refused = TcpStream::connect(server.addr).unwrap();
    refused
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut response = String::new();
    refused.read_to_string(&mut response).unwrap();

    assert!(response.starts_with("HTTP/1.1 503"));
    assert!(response.contains("maximum connections reached: 1"));

    server.stop();
}

#[test]
fn test_shutdown_stops_run_loop() {
    let server = start(Arc::new(MemoryStore::new()), local_config());
    assert!(!server.shutdown.is_shutdown());
    server.stop();
}
