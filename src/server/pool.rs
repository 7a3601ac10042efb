//! Bounded registry of live connections
//!
//! Admission control for the accept loop: a connection is only served if it
//! fits in the pool. Entries are keyed by the peer address.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::http::connection::ConnectionHandle;

/// Pool of live connections
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    connections: Arc<RwLock<HashMap<String, Arc<ConnectionHandle>>>>,
    max_connections: usize,
}

impl ConnectionPool {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            max_connections,
        }
    }

    /// Registers a connection if there is room.
    ///
    /// Returns false when the pool is full; the caller must then close the
    /// connection itself.
    pub async fn add(&self, key: impl Into<String>, conn: Arc<ConnectionHandle>) -> bool {
        let mut connections = self.connections.write().await;

        if connections.len() >= self.max_connections {
            return false;
        }

        connections.insert(key.into(), conn);
        true
    }

    /// Removes a connection. Removing an absent key is a no-op.
    ///
    /// Returns whether an entry was present.
    pub async fn remove(&self, key: &str) -> bool {
        self.connections.write().await.remove(key).is_some()
    }

    pub async fn get(&self, key: &str) -> Option<Arc<ConnectionHandle>> {
        self.connections.read().await.get(key).cloned()
    }

    /// Current number of live connections
    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}
