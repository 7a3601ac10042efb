//! HTTP/1.1 wire handling.
//!
//! Supports the `Content-Length` framed subset of HTTP/1.1 over persistent
//! connections.
//!
//! # Architecture
//!
//! - **`parser`**: reads one request off a buffered byte stream
//! - **`request`**: request representation and keep-alive policy
//! - **`response`**: response representation with builder pattern
//! - **`writer`**: serializes responses, always recomputing `Content-Length`
//! - **`connection`**: one socket plus its lifecycle state machine
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │    Idle     │ ← Wait for the next request (idle timeout)
//!        └──────┬──────┘
//!               │ Request bytes arrive
//!               ▼
//!        ┌──────────────────┐
//!        │     Active       │ ← Read, route, write response
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive and under request cap → Idle
//!               └─ Otherwise → Closed
//! ```
//!
//! Any state can move straight to `Closed` on a protocol error, an idle
//! timeout or an I/O failure. `Closed` is terminal.
//!
//! # Example
//!
//! ```ignore
//! use keepwire::http::connection::PersistentConnection;
//! use keepwire::http::response::Response;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let (socket, peer) = listener.accept().await?;
//!     let mut conn = PersistentConnection::new(socket, peer.to_string(), 100, Duration::from_secs(60));
//!
//!     let request = conn.read_request().await?;
//!     conn.write_response(&Response::ok(request.path.clone())).await?;
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
