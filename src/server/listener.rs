use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::http::connection::PersistentConnection;
use crate::router::Router;
use crate::server::pool::ConnectionPool;
use crate::server::shutdown::Shutdown;
use crate::server::worker::{serve_connection, Deadlines};

/// The HTTP server: listener, accept loop and connection workers.
///
/// Cheap to clone; clones share the pool, router and shutdown signal.
#[derive(Clone)]
pub struct Server {
    cfg: ServerConfig,
    router: Arc<Router>,
    pool: ConnectionPool,
    shutdown: Shutdown,
}

impl Server {
    /// Creates a server. The router must be fully populated here; it is
    /// read-only once the server runs.
    pub fn new(cfg: ServerConfig, router: Router) -> Self {
        let pool = ConnectionPool::new(cfg.max_connections);
        Self {
            cfg,
            router: Arc::new(router),
            pool,
            shutdown: Shutdown::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.cfg
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Handle on the shared cancellation signal. Triggering it stops the
    /// accept loop and closes the listener.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Binds `listen_addr` and runs the accept loop until shutdown.
    pub async fn listen_connection(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.cfg.listen_addr)
            .await
            .with_context(|| format!("failed to listen on {}", self.cfg.listen_addr))?;
        self.serve(listener).await
    }

    /// Runs the accept loop on an already bound listener.
    ///
    /// Returns `Ok(())` once shutdown is triggered; the listener is dropped,
    /// and so closed, on return. Accept errors are logged and retried.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        let local_addr = listener.local_addr().context("listener has no local address")?;
        info!("Listening on {}", local_addr);

        loop {
            let accepted = tokio::select! {
                res = listener.accept() => res,
                _ = self.shutdown.triggered() => {
                    info!("Shutting down server on {}", local_addr);
                    return Ok(());
                }
            };

            match accepted {
                Ok((socket, peer)) => self.admit(socket, peer).await,
                Err(e) => {
                    if self.shutdown.is_triggered() {
                        info!("Shutting down server on {}", local_addr);
                        return Ok(());
                    }
                    warn!(error = %e, "Error accepting connection");
                }
            }
        }
    }

    async fn admit(&self, socket: TcpStream, peer: SocketAddr) {
        let key = peer.to_string();
        let mut conn = PersistentConnection::new(
            socket,
            key.clone(),
            self.cfg.max_requests_per_connection,
            self.cfg.idle_timeout(),
        );

        if !self.pool.add(key.clone(), conn.handle()).await {
            warn!(
                peer = %key,
                max_connections = self.pool.max_connections(),
                "Connection pool full, dropping connection"
            );
            if let Err(e) = conn.close().await {
                debug!(peer = %key, error = %e, "Socket shutdown failed");
            }
            return;
        }

        let live = self.pool.count().await;
        info!(peer = %key, live, "Accepted connection");

        let deadlines = Deadlines {
            read: self.cfg.read_timeout(),
            write: self.cfg.write_timeout(),
        };
        let router = Arc::clone(&self.router);
        let pool = self.pool.clone();
        tokio::spawn(serve_connection(conn, router, pool, deadlines));
    }
}
