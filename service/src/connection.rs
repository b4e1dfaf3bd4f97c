//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Chat connection handle
//!
//! A connection is split into a cloneable [`ChatConnection`] that owns the
//! write side and a [`LineReader`] owned by the connection's worker. Closing
//! the connection shuts down the write side and wakes the worker so it stops
//! reading.

use crate::{ConnectionId, RelayError, Result};
use chatline_codec::ChatLineCodec;
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, instrument, trace};

type BoxedReader = Pin<Box<dyn AsyncRead + Send + Sync>>;
type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// A chat connection
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct ChatConnection {
    // Write side, `None` once closed
    writer: Arc<Mutex<Option<FramedWrite<BoxedWriter, ChatLineCodec>>>>,

    // Metadata (lock-free access)
    id: ConnectionId,
    peer_addr: SocketAddr,
    created_at: Instant,

    // Close signalling
    closed: Arc<AtomicBool>,
    close_notify: Arc<Notify>,

    // Metrics (lock-free)
    messages_sent: Arc<AtomicU64>,
    messages_received: Arc<AtomicU64>,
}

/// Read side of a [`ChatConnection`]
pub struct LineReader {
    inner: FramedRead<BoxedReader, ChatLineCodec>,
    id: ConnectionId,
    messages_received: Arc<AtomicU64>,
}

impl ChatConnection {
    /// Wrap an accepted TCP stream
    #[instrument(skip(socket), fields(connection_id = %id))]
    pub fn wrap(
        socket: TcpStream,
        id: ConnectionId,
        max_line_length: usize,
    ) -> Result<(Self, LineReader)> {
        let peer_addr = socket.peer_addr().map_err(RelayError::Connection)?;
        let (reader, writer) = socket.into_split();

        info!(peer_addr = %peer_addr, "Creating new chat connection");

        Ok(Self::from_parts(
            id,
            peer_addr,
            reader,
            writer,
            max_line_length,
        ))
    }

    /// Build a connection from arbitrary read and write halves
    pub fn from_parts<R, W>(
        id: ConnectionId,
        peer_addr: SocketAddr,
        reader: R,
        writer: W,
        max_line_length: usize,
    ) -> (Self, LineReader)
    where
        R: AsyncRead + Send + Sync + 'static,
        W: AsyncWrite + Send + 'static,
    {
        counter!("chatline.connections.total").increment(1);
        gauge!("chatline.connections.active").increment(1.0);

        let messages_received = Arc::new(AtomicU64::new(0));
        let reader: BoxedReader = Box::pin(reader);
        let writer: BoxedWriter = Box::pin(writer);

        let connection = Self {
            writer: Arc::new(Mutex::new(Some(FramedWrite::new(
                writer,
                ChatLineCodec::with_max_length(max_line_length),
            )))),
            id,
            peer_addr,
            created_at: Instant::now(),
            closed: Arc::new(AtomicBool::new(false)),
            close_notify: Arc::new(Notify::new()),
            messages_sent: Arc::new(AtomicU64::new(0)),
            messages_received: messages_received.clone(),
        };
        let reader = LineReader {
            inner: FramedRead::new(reader, ChatLineCodec::with_max_length(max_line_length)),
            id,
            messages_received,
        };

        (connection, reader)
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get when the connection was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Get lines sent
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Get lines received
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Check if the connection has been closed locally
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send one line (the line terminator is added)
    #[instrument(skip(self, line), fields(connection_id = %self.id))]
    pub async fn send_line(&self, line: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let Some(framed) = writer.as_mut() else {
            return Err(RelayError::ConnectionClosed);
        };

        match framed.send(line).await {
            Ok(()) => {
                self.messages_sent.fetch_add(1, Ordering::Relaxed);
                counter!("chatline.messages.sent").increment(1);
                trace!("Line sent");
                Ok(())
            }
            Err(e) => {
                counter!("chatline.errors.send").increment(1);
                debug!(error = %e, "Failed to send line");
                Err(e.into())
            }
        }
    }

    /// Close the connection
    ///
    /// Shuts down the write side and wakes the worker blocked on the read
    /// side. Closing an already closed connection succeeds without effect.
    #[instrument(skip(self), fields(connection_id = %self.id))]
    pub async fn close(&self) -> Result<()> {
        let writer = self.writer.lock().await.take();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.close_notify.notify_waiters();
        gauge!("chatline.connections.active").decrement(1.0);
        debug!("Closing connection");

        match writer {
            Some(mut framed) => SinkExt::<&str>::close(&mut framed)
                .await
                .map_err(RelayError::from),
            None => Ok(()),
        }
    }

    /// Resolve once [`close`](Self::close) has been called
    pub async fn closed(&self) {
        let notified = self.close_notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_closed() {
            return;
        }
        notified.await;
    }
}

impl LineReader {
    /// Receive the next line
    ///
    /// Returns `Ok(None)` when the peer closed the stream.
    #[instrument(skip(self), fields(connection_id = %self.id))]
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        match self.inner.next().await {
            Some(Ok(line)) => {
                self.messages_received.fetch_add(1, Ordering::Relaxed);
                counter!("chatline.messages.received").increment(1);
                trace!(line = %line, "Line received");
                Ok(Some(line))
            }
            Some(Err(e)) => {
                debug!(error = %e, "Error receiving line");
                Err(e.into())
            }
            None => {
                debug!("Connection stream ended");
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for ChatConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConnection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl std::fmt::Debug for LineReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineReader").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn pipe() -> (ChatConnection, LineReader, tokio::io::DuplexStream) {
        let (local, remote) = tokio::io::duplex(1024);
        let (r, w) = tokio::io::split(local);
        let (conn, reader) = ChatConnection::from_parts(
            ConnectionId::new(1),
            "127.0.0.1:4000".parse().unwrap(),
            r,
            w,
            64,
        );
        (conn, reader, remote)
    }

    #[tokio::test]
    async fn test_send_and_receive_lines() {
        let (conn, mut reader, remote) = pipe();
        let (remote_r, mut remote_w) = tokio::io::split(remote);

        conn.send_line("alice - hello").await.unwrap();
        let mut lines = BufReader::new(remote_r).lines();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "alice - hello");

        remote_w.write_all(b"#login bob\r\n").await.unwrap();
        assert_eq!(reader.next_line().await.unwrap().unwrap(), "#login bob");

        assert_eq!(conn.messages_sent(), 1);
        assert_eq!(conn.messages_received(), 1);
    }

    #[tokio::test]
    async fn test_peer_close_ends_stream() {
        let (_conn, mut reader, remote) = pipe();
        drop(remote);
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_too_long_is_transport_failure() {
        let (_conn, mut reader, mut remote) = pipe();
        remote.write_all(&[b'x'; 100]).await.unwrap();
        remote.write_all(b"\n").await.unwrap();
        assert!(matches!(
            reader.next_line().await,
            Err(RelayError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_wakes_waiters() {
        let (conn, _reader, _remote) = pipe();
        let waiter = conn.clone();
        let wait = tokio::spawn(async move { waiter.closed().await });

        conn.close().await.unwrap();
        assert!(conn.is_closed());
        conn.close().await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), wait)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            conn.send_line("late").await,
            Err(RelayError::ConnectionClosed)
        ));
    }
}
