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

//! Chat client session state machine
//!
//! A [`ChatClient`] moves through `Disconnected → Connecting →
//! Authenticating → Active` and back to `Disconnected`. Connecting sends the
//! login line right away without waiting for an answer. A background task
//! displays every inbound line; when the server goes away that task reports
//! the termination through [`ChatClient::terminated`].

use crate::{ClientConfig, ClientError, Result};
use chatline_codec::{ChatLineCodec, Identity, ServerLine, format_login, relayed_line_limit};
use chatline_service::DisplaySink;
use futures_util::{SinkExt, StreamExt};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

/// Shown when the server closes the connection or it fails
pub const SERVER_SHUT_DOWN: &str = "The server has shut down.  Terminating client.";

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection
    Disconnected,
    /// Opening the transport
    Connecting,
    /// Transport open, login line being sent
    Authenticating,
    /// Logged in
    Active,
}

struct Session {
    host: String,
    port: u16,
    state: SessionState,
    writer: Option<FramedWrite<OwnedWriteHalf, ChatLineCodec>>,
    reader: Option<JoinHandle<()>>,
    // Bumped on every connect so a stale reader task can tell it is stale
    generation: u64,
}

struct Inner {
    identity: Identity,
    connect_timeout: Duration,
    max_line_length: usize,
    session: Mutex<Session>,
    display: Arc<dyn DisplaySink>,
    terminate_tx: mpsc::UnboundedSender<String>,
    terminate_rx: Mutex<mpsc::UnboundedReceiver<String>>,
}

/// Chat client
///
/// Cloning yields another handle to the same session, so the console and the
/// binary can share it.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<Inner>,
}

impl ChatClient {
    /// Create a disconnected client
    pub fn new(config: ClientConfig, display: Arc<dyn DisplaySink>) -> Self {
        let (terminate_tx, terminate_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                identity: config.identity,
                connect_timeout: config.connect_timeout,
                max_line_length: config.max_line_length,
                session: Mutex::new(Session {
                    host: config.host,
                    port: config.port,
                    state: SessionState::Disconnected,
                    writer: None,
                    reader: None,
                    generation: 0,
                }),
                display,
                terminate_tx,
                terminate_rx: Mutex::new(terminate_rx),
            }),
        }
    }

    /// Get the login identity
    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    /// Get the current state
    pub async fn state(&self) -> SessionState {
        self.inner.session.lock().await.state
    }

    /// Check whether a connection is open or being opened
    pub async fn is_connected(&self) -> bool {
        self.state().await != SessionState::Disconnected
    }

    /// Get the target host
    pub async fn host(&self) -> String {
        self.inner.session.lock().await.host.clone()
    }

    /// Get the target port
    pub async fn port(&self) -> u16 {
        self.inner.session.lock().await.port
    }

    /// Change the target host, only while disconnected
    pub async fn set_host(&self, host: impl Into<String>) -> Result<()> {
        let mut session = self.inner.session.lock().await;
        if session.state != SessionState::Disconnected {
            return Err(ClientError::AlreadyConnected);
        }
        session.host = host.into();
        Ok(())
    }

    /// Change the target port, only while disconnected
    pub async fn set_port(&self, port: u16) -> Result<()> {
        let mut session = self.inner.session.lock().await;
        if session.state != SessionState::Disconnected {
            return Err(ClientError::AlreadyConnected);
        }
        if port == 0 {
            return Err(ClientError::InvalidArgument(port.to_string()));
        }
        session.port = port;
        Ok(())
    }

    /// Open the connection and send the login line
    ///
    /// Does not wait for the server to acknowledge the login.
    pub async fn connect(&self) -> Result<()> {
        let address = {
            let mut session = self.inner.session.lock().await;
            if session.state != SessionState::Disconnected {
                return Err(ClientError::AlreadyConnected);
            }
            session.state = SessionState::Connecting;
            format!("{}:{}", session.host, session.port)
        };

        info!(address = %address, "Connecting");
        let stream = match timeout(self.inner.connect_timeout, TcpStream::connect(&address)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.reset().await;
                return Err(ClientError::Connection(e));
            }
            Err(_) => {
                self.reset().await;
                return Err(ClientError::ConnectionTimeout);
            }
        };
        let (read, write) = stream.into_split();

        let mut session = self.inner.session.lock().await;
        session.state = SessionState::Authenticating;
        session.generation += 1;
        let generation = session.generation;

        let mut writer =
            FramedWrite::new(write, ChatLineCodec::with_max_length(self.inner.max_line_length));
        if let Err(e) = writer.send(format_login(&self.inner.identity)).await {
            session.state = SessionState::Disconnected;
            return Err(e.into());
        }
        counter!("chatline.messages.sent").increment(1);

        // Relayed lines carry a sender tag or notice prefix on top of the payload
        let reader = FramedRead::new(
            read,
            ChatLineCodec::with_max_length(relayed_line_limit(self.inner.max_line_length)),
        );
        session.writer = Some(writer);
        session.reader = Some(tokio::spawn(read_loop(self.inner.clone(), reader, generation)));
        session.state = SessionState::Active;
        drop(session);

        info!(identity = %self.inner.identity, "Logged on");
        self.inner
            .display
            .display(&format!("{} has logged on.", self.inner.identity));
        Ok(())
    }

    /// Send one line to the server
    ///
    /// Fails with [`NotConnected`](ClientError::NotConnected) when there is
    /// no open connection and with [`LineTooLong`](ClientError::LineTooLong)
    /// when the server would refuse the line. A refused line is not sent.
    pub async fn send_line(&self, line: &str) -> Result<()> {
        let mut session = self.inner.session.lock().await;
        let writer = session.writer.as_mut().ok_or(ClientError::NotConnected)?;
        if line.len() > self.inner.max_line_length {
            return Err(ClientError::LineTooLong {
                length: line.len(),
                max: self.inner.max_line_length,
            });
        }
        match writer.send(line).await {
            Ok(()) => {
                counter!("chatline.messages.sent").increment(1);
                Ok(())
            }
            Err(e) => {
                counter!("chatline.errors.send").increment(1);
                Err(e.into())
            }
        }
    }

    /// Close the connection
    ///
    /// Close errors are swallowed. Returns whether a connection was open.
    /// Safe to call from any task, any number of times.
    pub async fn disconnect(&self) -> bool {
        let (writer, reader) = {
            let mut session = self.inner.session.lock().await;
            if session.state == SessionState::Disconnected {
                return false;
            }
            session.state = SessionState::Disconnected;
            (session.writer.take(), session.reader.take())
        };

        if let Some(reader) = reader {
            reader.abort();
        }
        if let Some(mut writer) = writer {
            if let Err(e) = SinkExt::<&str>::close(&mut writer).await {
                debug!(error = %e, "Error closing connection");
            }
        }
        info!("Disconnected");
        true
    }

    /// Wait for the session to end on the server's initiative
    ///
    /// Resolves with the notice to show before exiting.
    pub async fn terminated(&self) -> Option<String> {
        self.inner.terminate_rx.lock().await.recv().await
    }

    async fn reset(&self) {
        self.inner.session.lock().await.state = SessionState::Disconnected;
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("identity", &self.inner.identity)
            .finish_non_exhaustive()
    }
}

async fn read_loop(
    inner: Arc<Inner>,
    mut reader: FramedRead<OwnedReadHalf, ChatLineCodec>,
    generation: u64,
) {
    let failure = loop {
        match reader.next().await {
            Some(Ok(line)) => {
                counter!("chatline.messages.received").increment(1);
                match ServerLine::parse(&line) {
                    ServerLine::Notice(text) => debug!(notice = %text, "Server notice"),
                    ServerLine::Rejection => warn!("Server rejected the login"),
                    ServerLine::Chat { sender, .. } => debug!(sender = %sender, "Chat received"),
                    ServerLine::Other(_) => {}
                }
                inner.display.display(&line);
            }
            Some(Err(e)) => break Some(e),
            None => break None,
        }
    };

    let mut session = inner.session.lock().await;
    if session.generation != generation || session.state == SessionState::Disconnected {
        // Closed locally
        return;
    }
    session.state = SessionState::Disconnected;
    session.writer = None;
    session.reader = None;
    drop(session);

    match failure {
        Some(e) => warn!(error = %e, "Connection failed"),
        None => info!("Server closed the connection"),
    }
    let _ = inner.terminate_tx.send(SERVER_SHUT_DOWN.to_string());
}
