//! Listener, accept loop and connection workers.
//!
//! - **`listener`**: the [`Server`](listener::Server) and its accept loop
//! - **`worker`**: the per-connection request/response loop
//! - **`pool`**: bounded registry of live connections used for admission
//! - **`shutdown`**: shared cancellation signal

pub mod listener;
pub mod pool;
pub mod shutdown;
pub mod worker;

pub use listener::Server;
pub use pool::ConnectionPool;
pub use shutdown::Shutdown;
