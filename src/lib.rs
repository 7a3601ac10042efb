//! keepwire - HTTP/1.1 server on raw TCP sockets
//!
//! Core library: wire codec, persistent connections, connection pool,
//! router and server.

pub mod config;
pub mod http;
pub mod router;
pub mod server;
