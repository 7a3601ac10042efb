//! Tests for the persistent connection state machine

use std::time::{Duration, Instant};

use keepwire::http::connection::{ConnectionState, PersistentConnection};
use keepwire::http::parser::ParseError;
use keepwire::http::response::Response;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

fn connection(max_requests: usize) -> (PersistentConnection<DuplexStream>, DuplexStream) {
    let (server, client) = duplex(4096);
    let conn = PersistentConnection::new(server, "127.0.0.1:50000", max_requests, Duration::from_secs(5));
    (conn, client)
}

#[test]
fn test_connection_starts_idle() {
    let (server, _client) = duplex(64);
    let conn = PersistentConnection::new(server, "peer", 3, Duration::from_secs(1));

    assert_eq!(conn.state(), ConnectionState::Idle);
    assert_eq!(conn.request_count(), 0);
    assert_eq!(conn.key(), "peer");
    assert!(conn.can_serve_more());
}

#[tokio::test]
async fn test_can_serve_more_until_limit() {
    let (conn, _client) = connection(3);

    for served in 0..3 {
        assert_eq!(conn.request_count(), served);
        assert!(conn.can_serve_more());
        conn.increment_request_count();
    }

    assert_eq!(conn.request_count(), 3);
    assert!(!conn.can_serve_more());
}

#[tokio::test]
async fn test_is_last_request() {
    let (conn, _client) = connection(2);

    assert!(!conn.is_last_request());
    conn.increment_request_count();
    assert!(conn.is_last_request());
}

#[tokio::test]
async fn test_state_transitions() {
    let (conn, _client) = connection(2);

    assert!(conn.begin_request());
    assert_eq!(conn.state(), ConnectionState::Active);

    conn.increment_request_count();
    assert!(conn.finish_request());
    assert_eq!(conn.state(), ConnectionState::Idle);

    assert!(conn.begin_request());
    conn.increment_request_count();
    // Cap reached: stays Active until closed.
    assert!(!conn.finish_request());
    assert_eq!(conn.state(), ConnectionState::Active);
}

#[tokio::test]
async fn test_increment_refreshes_last_active() {
    let (conn, _client) = connection(5);
    let handle = conn.handle();
    let before = handle.last_active_at();

    tokio::time::sleep(Duration::from_millis(5)).await;
    conn.increment_request_count();

    assert!(handle.last_active_at() > before);
    assert!(handle.created_at() <= before);
}

#[tokio::test]
async fn test_idle_deadline_follows_last_activity() {
    let idle = Duration::from_millis(100);
    let (server, _client) = duplex(64);
    let before = Instant::now();
    let conn = PersistentConnection::new(server, "peer", 3, idle);
    let after = Instant::now();

    let first = conn.idle_deadline();
    assert!(first >= before + idle && first <= after + idle);

    tokio::time::sleep(Duration::from_millis(5)).await;
    conn.increment_request_count();

    assert!(conn.idle_deadline() > first);
    assert_eq!(conn.idle_deadline(), conn.handle().last_active_at() + idle);
}

#[tokio::test]
async fn test_read_request_and_write_response() {
    let (mut conn, mut client) = connection(5);

    client.write_all(b"GET /health HTTP/1.1\r\n\r\n").await.unwrap();
    assert!(conn.wait_for_data().await.unwrap());

    let request = conn.read_request().await.unwrap();
    assert_eq!(request.path, "/health");

    conn.write_response(&Response::ok("OK")).await.unwrap();
    conn.close().await.unwrap();

    let mut received = Vec::new();
    client.read_to_end(&mut received).await.unwrap();
    let text = String::from_utf8(received).unwrap();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.ends_with("\r\n\r\nOK"));
}

#[tokio::test]
async fn test_wait_for_data_reports_peer_close() {
    let (mut conn, client) = connection(5);
    drop(client);

    assert!(!conn.wait_for_data().await.unwrap());
}

#[tokio::test]
async fn test_close_twice_is_harmless() {
    let (mut conn, _client) = connection(5);
    let handle = conn.handle();

    conn.close().await.unwrap();
    assert_eq!(handle.state(), ConnectionState::Closed);

    conn.close().await.unwrap();
    assert_eq!(handle.state(), ConnectionState::Closed);
    assert_eq!(handle.request_count(), 0);
}

#[tokio::test]
async fn test_no_io_after_close() {
    let (mut conn, _client) = connection(5);
    conn.close().await.unwrap();

    assert!(!conn.begin_request());
    assert!(matches!(conn.read_request().await, Err(ParseError::Io(_))));
    let err = conn.write_response(&Response::ok("late")).await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
    assert!(conn.wait_for_data().await.is_err());
}

#[tokio::test]
async fn test_handle_is_shared_with_connection() {
    let (conn, _client) = connection(5);
    let handle = conn.handle();

    conn.increment_request_count();
    conn.increment_request_count();

    assert_eq!(handle.request_count(), 2);
    assert_eq!(handle.max_requests(), 5);
    assert_eq!(handle.idle_timeout(), Duration::from_secs(5));
}
