use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::http::parser::{read_request, ParseError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the next request
    Idle,
    /// A request is being read or answered
    Active,
    /// Terminal, the socket has been released
    Closed,
}

#[derive(Debug)]
struct Lifecycle {
    state: ConnectionState,
    request_count: usize,
    max_requests: usize,
    created_at: Instant,
    last_active_at: Instant,
    idle_timeout: Duration,
}

/// Lifecycle bookkeeping for one connection, shared with the pool.
///
/// Holds no socket: the pool can inspect a connection through this handle
/// but only the owning worker can do I/O or close it.
#[derive(Debug)]
pub struct ConnectionHandle {
    key: String,
    inner: Mutex<Lifecycle>,
}

impl ConnectionHandle {
    fn new(key: String, max_requests: usize, idle_timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            key,
            inner: Mutex::new(Lifecycle {
                state: ConnectionState::Idle,
                request_count: 0,
                max_requests,
                created_at: now,
                last_active_at: now,
                idle_timeout,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pool key, the remote address.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    pub fn request_count(&self) -> usize {
        self.lock().request_count
    }

    pub fn max_requests(&self) -> usize {
        self.lock().max_requests
    }

    pub fn created_at(&self) -> Instant {
        self.lock().created_at
    }

    pub fn last_active_at(&self) -> Instant {
        self.lock().last_active_at
    }

    pub fn idle_timeout(&self) -> Duration {
        self.lock().idle_timeout
    }

    /// Counts one completed exchange and refreshes the activity timestamp.
    pub fn increment_request_count(&self) {
        let mut inner = self.lock();
        inner.request_count += 1;
        inner.last_active_at = Instant::now();
    }

    /// True while the request cap has not been reached.
    pub fn can_serve_more(&self) -> bool {
        let inner = self.lock();
        inner.request_count < inner.max_requests
    }

    /// True when the request now in flight is the last one allowed.
    pub fn is_last_request(&self) -> bool {
        let inner = self.lock();
        inner.request_count + 1 >= inner.max_requests
    }

    /// Instant at which the connection counts as idle for too long, measured
    /// from its last activity.
    pub fn idle_deadline(&self) -> Instant {
        let inner = self.lock();
        inner.last_active_at + inner.idle_timeout
    }

    fn begin_request(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            ConnectionState::Idle => {
                inner.state = ConnectionState::Active;
                inner.last_active_at = Instant::now();
                true
            }
            ConnectionState::Active => true,
            ConnectionState::Closed => false,
        }
    }

    fn finish_request(&self) -> bool {
        let mut inner = self.lock();
        if inner.state == ConnectionState::Active && inner.request_count < inner.max_requests {
            inner.state = ConnectionState::Idle;
            true
        } else {
            false
        }
    }

    fn mark_closed(&self) {
        self.lock().state = ConnectionState::Closed;
    }
}

/// One accepted socket tracked across sequential request/response exchanges.
///
/// Owned by exactly one worker task. The pool only ever sees the
/// [`ConnectionHandle`].
pub struct PersistentConnection<S = TcpStream> {
    stream: Option<BufReader<S>>,
    handle: Arc<ConnectionHandle>,
}

impl<S> PersistentConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        key: impl Into<String>,
        max_requests: usize,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            stream: Some(BufReader::new(stream)),
            handle: Arc::new(ConnectionHandle::new(key.into(), max_requests, idle_timeout)),
        }
    }

    pub fn handle(&self) -> Arc<ConnectionHandle> {
        Arc::clone(&self.handle)
    }

    pub fn key(&self) -> &str {
        self.handle.key()
    }

    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    pub fn request_count(&self) -> usize {
        self.handle.request_count()
    }

    pub fn increment_request_count(&self) {
        self.handle.increment_request_count();
    }

    pub fn can_serve_more(&self) -> bool {
        self.handle.can_serve_more()
    }

    pub fn is_last_request(&self) -> bool {
        self.handle.is_last_request()
    }

    pub fn idle_deadline(&self) -> Instant {
        self.handle.idle_deadline()
    }

    /// Idle -> Active. Returns false once the connection is closed.
    pub fn begin_request(&self) -> bool {
        self.handle.begin_request()
    }

    /// Active -> Idle, only while more requests are allowed.
    pub fn finish_request(&self) -> bool {
        self.handle.finish_request()
    }

    fn stream_mut(&mut self) -> io::Result<&mut BufReader<S>> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))
    }

    /// Waits until request bytes are buffered.
    ///
    /// Returns `Ok(false)` when the peer closed its side without sending
    /// anything, which is the normal end of a keep-alive connection.
    pub async fn wait_for_data(&mut self) -> io::Result<bool> {
        let stream = self.stream_mut()?;
        let buf = stream.fill_buf().await?;
        Ok(!buf.is_empty())
    }

    pub async fn read_request(&mut self) -> Result<Request, ParseError> {
        let stream = self.stream_mut()?;
        read_request(stream).await
    }

    pub async fn write_response(&mut self, response: &Response) -> io::Result<()> {
        let stream = self.stream_mut()?;
        ResponseWriter::new(response).write_to_stream(stream).await
    }

    /// Moves to `Closed` and releases the socket.
    ///
    /// Only the first call touches the socket and reports its shutdown
    /// error; later calls return `Ok(())`.
    pub async fn close(&mut self) -> io::Result<()> {
        self.handle.mark_closed();
        match self.stream.take() {
            Some(mut stream) => stream.shutdown().await,
            None => Ok(()),
        }
    }
}
