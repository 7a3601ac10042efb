//! Per-connection request loop.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{timeout, timeout_at};
use tracing::{debug, error, warn};

use crate::http::connection::PersistentConnection;
use crate::http::response::Response;
use crate::router::Router;
use crate::server::pool::ConnectionPool;

/// Deadlines applied to every exchange on a connection.
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    pub read: Duration,
    pub write: Duration,
}

/// Why a connection left the request loop without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// Client closed its side between requests
    PeerClosed,
    /// No new request within the idle timeout
    IdleTimeout,
    /// Client asked for `Connection: close` or spoke HTTP/1.0
    ClientClose,
    /// Per-connection request cap reached
    RequestLimit,
    /// Handler panicked; a 500 was sent
    HandlerPanic,
}

/// Serves one connection until it closes, then releases it.
///
/// Always closes the socket and removes `conn` from `pool` exactly once,
/// whatever ended the loop.
pub async fn serve_connection<S>(
    mut conn: PersistentConnection<S>,
    router: Arc<Router>,
    pool: ConnectionPool,
    deadlines: Deadlines,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let key = conn.key().to_string();

    match run(&mut conn, &router, deadlines).await {
        Ok(reason) => {
            debug!(peer = %key, ?reason, requests = conn.request_count(), "Closing connection");
        }
        Err(e) => {
            warn!(peer = %key, requests = conn.request_count(), "Connection error: {:#}", e);
        }
    }

    if let Err(e) = conn.close().await {
        debug!(peer = %key, error = %e, "Socket shutdown failed");
    }
    pool.remove(&key).await;
}

async fn run<S>(
    conn: &mut PersistentConnection<S>,
    router: &Router,
    deadlines: Deadlines,
) -> anyhow::Result<CloseReason>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        // Idle wait for the first byte of the next request.
        let idle_deadline = tokio::time::Instant::from_std(conn.idle_deadline());
        match timeout_at(idle_deadline, conn.wait_for_data()).await {
            Err(_) => return Ok(CloseReason::IdleTimeout),
            Ok(Ok(false)) => return Ok(CloseReason::PeerClosed),
            Ok(Ok(true)) => {}
            Ok(Err(e)) => return Err(e).context("read failed while idle"),
        }

        if !conn.begin_request() {
            anyhow::bail!("connection closed before request");
        }

        let request = timeout(deadlines.read, conn.read_request())
            .await
            .context("read timed out")?
            .context("failed to parse request")?;

        debug!(
            peer = %conn.key(),
            method = %request.method,
            path = %request.path,
            version = %request.version,
            body_len = request.body.len(),
            "Request received"
        );

        let (mut response, panicked) =
            match catch_unwind(AssertUnwindSafe(|| router.dispatch(&request))) {
                Ok(response) => (response, false),
                Err(_) => {
                    error!(
                        peer = %conn.key(),
                        method = %request.method,
                        path = %request.path,
                        "Handler panicked"
                    );
                    (Response::internal_error(), true)
                }
            };

        let client_keep_alive = request.keep_alive();
        let keep_alive = client_keep_alive && !panicked && !conn.is_last_request();
        response.set_header("Connection", if keep_alive { "keep-alive" } else { "close" });

        timeout(deadlines.write, conn.write_response(&response))
            .await
            .context("write timed out")?
            .context("failed to write response")?;

        conn.increment_request_count();

        debug!(
            peer = %conn.key(),
            status = response.status.as_u16(),
            method = %request.method,
            path = %request.path,
            "Response sent"
        );

        if panicked {
            return Ok(CloseReason::HandlerPanic);
        }
        if !client_keep_alive {
            return Ok(CloseReason::ClientClose);
        }
        if !conn.can_serve_more() {
            return Ok(CloseReason::RequestLimit);
        }

        conn.finish_request();
    }
}
